#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("UserError: {0}")]
    UserError(String),

    #[error("ConfigError: {0}")]
    ConfigError(String),

    #[error("AuthError: {0}")]
    AuthError(String),

    /// Explicitly empty password; the user gave up
    #[error("OneLogin authentication aborted")]
    AuthAborted,

    #[error("AuthRejected: {0}")]
    AuthRejected(String),

    #[error("MFA failed: {0}")]
    MfaFailed(String),

    #[error("Configured MFA device {0} is not valid for this account")]
    InvalidDevice(i64),

    #[error("NotFound: {0}")]
    NotFound(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("DecodeError: {0}")]
    DecodeError(String),

    #[error("SamlError: {0}")]
    SamlError(String),

    #[error("Unable to find the role '{0}' in SAML assertion")]
    RoleArnMismatch(String),

    #[error("Invalid duration {0}s; must be between {min} and {max} seconds", min = crate::federation::MIN_DURATION_SECONDS, max = crate::federation::MAX_DURATION_SECONDS)]
    InvalidDuration(i32),

    #[error("SecretStoreError: {0}")]
    SecretStoreError(String),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    Base64Error(#[from] base64::DecodeError),

    #[error(transparent)]
    XmlError(#[from] roxmltree::Error),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    RemoteError(#[from] crate::client::Error),

    #[error("ProviderError({url}): {message}; {status_code:}")]
    ProviderError {
        url: url::Url,
        status_code: reqwest::StatusCode,
        message: String,
    },

    /// Failure, but we don't want to emit error to stderr/out anymore. Used in cmd
    #[error("")]
    FailureButSilentlyExit,

    /// Failure, but we don't want to emit error to stderr/out anymore. Used in cmd
    #[error("")]
    SilentlyExitWithCode(std::process::ExitCode),
}

impl Error {
    /// Cache misses (absent or lapsed entries) are never fatal; callers fall back to authenticating.
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Expired(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
