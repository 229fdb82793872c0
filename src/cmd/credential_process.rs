#[derive(clap::Args, Debug)]
pub struct CredentialProcessArgs {
    #[command(flatten)]
    pub credential: crate::cmd::CredentialArgs,
}

#[tokio::main(flavor = "current_thread")]
pub async fn run(
    global: &crate::cmd::GlobalArgs,
    args: &CredentialProcessArgs,
) -> Result<(), anyhow::Error> {
    let cred = crate::cmd::obtain_credentials(global, &args.credential).await?;
    serde_json::to_writer(std::io::stdout(), &CredentialProcessResponse::from(&cred))?;
    Ok(())
}

/// https://docs.aws.amazon.com/sdkref/latest/guide/feature-process-credentials.html
#[derive(Clone, Debug, serde::Serialize, zeroize::ZeroizeOnDrop)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialProcessResponse {
    pub version: i64,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    #[zeroize(skip)]
    pub expiration: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&crate::credentials::TemporaryCredential> for CredentialProcessResponse {
    fn from(cred: &crate::credentials::TemporaryCredential) -> CredentialProcessResponse {
        use secrecy::ExposeSecret;
        let session_token = cred.session_token.expose_secret();
        CredentialProcessResponse {
            version: 1,
            access_key_id: cred.access_key_id.clone(),
            secret_access_key: cred.secret_access_key.expose_secret().to_owned(),
            session_token: if session_token.is_empty() {
                None
            } else {
                Some(session_token.to_owned())
            },
            expiration: Some(cred.expiration),
        }
    }
}
