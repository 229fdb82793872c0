/// Credentials are treated as expired this long before AWS says they are.
pub const EXPIRY_FUZZ_SECONDS: i64 = 5;

/// Short-lived AWS credentials for one role, stored per alias in the secret store
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TemporaryCredential {
    #[serde(rename = "ROLE_ARN")]
    pub role_arn: String,
    #[serde(rename = "AWS_ACCESS_KEY_ID")]
    pub access_key_id: String,
    #[serde(
        rename = "AWS_SECRET_ACCESS_KEY",
        serialize_with = "crate::utils::serialize_secret"
    )]
    pub secret_access_key: secrecy::SecretString,
    #[serde(
        rename = "AWS_SESSION_TOKEN",
        serialize_with = "crate::utils::serialize_secret"
    )]
    pub session_token: secrecy::SecretString,
    #[serde(rename = "AWS_SESSION_EXPIRATION")]
    pub expiration: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "AWS_DEFAULT_REGION", default)]
    pub region: String,
    /// `Issuer` of the AssumeRoleWithSAML response
    #[serde(rename = "STS_ISSUER", default)]
    pub issuer: String,
}

impl TemporaryCredential {
    pub fn is_expired_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        now + chrono::TimeDelta::seconds(EXPIRY_FUZZ_SECONDS) >= self.expiration
    }

    pub fn expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now())
    }

    /// Blanks the secrets and expires the record in place.
    pub fn flush(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.secret_access_key = "".into();
        self.session_token = "".into();
        self.expiration = now;
    }

    pub fn expires_in_string(&self, now: chrono::DateTime<chrono::Utc>) -> String {
        let left = self.expiration - now;
        if left <= chrono::TimeDelta::zero() {
            return "Expired".to_owned();
        }
        format!("{:02}h {:02}m", left.num_hours(), left.num_minutes() % 60)
    }

    /// Environment for a child process using these credentials as `alias`.
    pub fn env_vars(&self, alias: &str) -> Vec<(&'static str, zeroize::Zeroizing<String>)> {
        use secrecy::ExposeSecret;
        let plain = |s: &str| zeroize::Zeroizing::new(s.to_owned());
        vec![
            ("AWS_ACCESS_KEY_ID", plain(&self.access_key_id)),
            (
                "AWS_SECRET_ACCESS_KEY",
                plain(self.secret_access_key.expose_secret()),
            ),
            ("AWS_SESSION_TOKEN", plain(self.session_token.expose_secret())),
            (
                "AWS_SESSION_EXPIRATION",
                plain(&self.expiration.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            ),
            ("AWS_DEFAULT_REGION", plain(&self.region)),
            ("AWS_REGION", plain(&self.region)),
            ("AWS_ROLE_ARN", plain(&self.role_arn)),
            ("AWS_ENABLED_PROFILE", plain(alias)),
        ]
    }
}
