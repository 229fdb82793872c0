/// OneLogin answers the client-credentials grant with its own envelope
/// (`created_at`, `account_id`), so the oauth2 crate's standard response type doesn't fit.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct OneLoginTokenResponse {
    pub access_token: secrecy::SecretString,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expires_in: i64,
    #[serde(deserialize_with = "oauth2::helpers::deserialize_untagged_enum_case_insensitive")]
    pub token_type: oauth2::basic::BasicTokenType,
    #[serde(default)]
    pub account_id: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct ClientCredentialsRequest {
    pub grant_type: &'static str,
}

impl Default for ClientCredentialsRequest {
    fn default() -> Self {
        Self {
            grant_type: "client_credentials",
        }
    }
}

/// Long-lived OneLogin API credentials, stored under `oauth:config`
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OAuthConfig {
    #[serde(rename = "clientid")]
    pub client_id: oauth2::ClientId,
    pub secret: oauth2::ClientSecret,
}

/// OneLogin issues client ids and secrets as 64 character strings.
pub const CLIENT_CREDENTIAL_LENGTH: usize = 64;

impl OAuthConfig {
    pub fn new(client_id: String, secret: String) -> crate::Result<Self> {
        if client_id.is_empty() {
            return Err(crate::Error::ConfigError(
                "Missing OneLogin client_id".to_owned(),
            ));
        }
        if secret.is_empty() {
            return Err(crate::Error::ConfigError(
                "Missing OneLogin client_secret".to_owned(),
            ));
        }
        Ok(Self {
            client_id: oauth2::ClientId::new(client_id),
            secret: oauth2::ClientSecret::new(secret),
        })
    }

    /// `OL_CLIENT_ID` and `OL_CLIENT_SECRET` take precedence over the secret store.
    pub fn from_env() -> crate::Result<Option<Self>> {
        Self::from_vars(
            std::env::var("OL_CLIENT_ID").ok(),
            std::env::var("OL_CLIENT_SECRET").ok(),
        )
    }

    /// Empty values count as unset; setting only one of the pair is an error.
    fn from_vars(client_id: Option<String>, secret: Option<String>) -> crate::Result<Option<Self>> {
        let client_id = client_id.filter(|s| !s.is_empty());
        let secret = secret.filter(|s| !s.is_empty());
        match (client_id, secret) {
            (None, None) => Ok(None),
            (Some(id), Some(secret)) => Self::new(id, secret).map(Some),
            (Some(_), None) => Err(crate::Error::ConfigError(
                "OL_CLIENT_ID is set but OL_CLIENT_SECRET is missing".to_owned(),
            )),
            (None, Some(_)) => Err(crate::Error::ConfigError(
                "OL_CLIENT_SECRET is set but OL_CLIENT_ID is missing".to_owned(),
            )),
        }
    }

    pub fn masked_secret(&self) -> String {
        let s = self.secret.secret();
        let tail: String = s
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}{}", "*".repeat(s.chars().count().saturating_sub(4)), tail)
    }
}
