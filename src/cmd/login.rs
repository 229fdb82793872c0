#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    #[command(flatten)]
    pub credential: crate::cmd::CredentialArgs,

    /// Print `export` lines for the credentials to stdout
    #[arg(long, default_value_t = false)]
    pub export: bool,
}

#[tokio::main(flavor = "current_thread")]
pub async fn run(global: &crate::cmd::GlobalArgs, args: &LoginArgs) -> Result<(), anyhow::Error> {
    let cred = crate::cmd::obtain_credentials(global, &args.credential).await?;
    let alias = &args.credential.alias;

    if args.export {
        let mut out = zeroize::Zeroizing::new(String::new());
        for (name, value) in cred.env_vars(alias) {
            out.push_str(&format!("export {name}={}\n", shell_quote(&value)));
        }
        print!("{}", out.as_str());
    } else {
        let product = env!("CARGO_PKG_NAME");
        let role = &cred.role_arn;
        let left = cred.expires_in_string(chrono::Utc::now());
        eprintln!(":: {product} :: Credentials for {alias} ({role}) are valid for {left}");
    }
    Ok(())
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
