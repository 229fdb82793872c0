/// OneLogin OAuth2 access token; good for 10 hours after issuance.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AccessToken {
    #[serde(serialize_with = "crate::utils::serialize_secret")]
    pub access_token: secrecy::SecretString,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Lifetime in seconds, counted from `created_at`
    pub expires_in: i64,
    #[serde(deserialize_with = "oauth2::helpers::deserialize_untagged_enum_case_insensitive")]
    pub token_type: oauth2::basic::BasicTokenType,
    #[serde(default)]
    pub account_id: Option<i64>,
}

impl AccessToken {
    /// Providers that omit `created_at` get the local receive time.
    pub(crate) fn from_token_response(
        resp: crate::ext_oauth2::OneLoginTokenResponse,
        received_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            access_token: resp.access_token,
            created_at: resp.created_at.unwrap_or(received_at),
            expires_in: resp.expires_in,
            token_type: resp.token_type,
            account_id: resp.account_id,
        }
    }

    pub fn expires_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at + chrono::TimeDelta::seconds(self.expires_in)
    }

    /// Valid strictly before `created_at + expires_in`.
    pub fn is_valid_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        use secrecy::ExposeSecret;
        !self.access_token.expose_secret().is_empty() && now < self.expires_at()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(chrono::Utc::now())
    }
}
