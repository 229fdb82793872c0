fn home_dir() -> std::path::PathBuf {
    std::env::var_os("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

pub fn config_dir() -> std::path::PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(|x| x.into())
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join(env!("CARGO_PKG_NAME"))
}

pub fn state_dir() -> std::path::PathBuf {
    match std::env::var("XDG_STATE_HOME") {
        Ok(d) => std::path::PathBuf::from(d),
        Err(_) => home_dir().join(".local").join("state"),
    }
    .join(env!("CARGO_PKG_NAME"))
}

pub fn cache_dir() -> std::path::PathBuf {
    state_dir().join("cache")
}

pub fn cache_path() -> std::path::PathBuf {
    cache_dir().join("onelogin.cache.json")
}

pub fn config_path() -> std::path::PathBuf {
    config_dir().join("config.yaml")
}

pub const DEFAULT_ONELOGIN_REGION: &str = "us";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_DURATION_SECONDS: i32 = 3600;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    pub config_path: std::path::PathBuf,

    /// OneLogin region (us, eu)
    #[serde(default = "default_onelogin_region")]
    pub region: String,
    /// Overrides https://api.{region}.onelogin.com
    pub api_url: Option<url::Url>,
    /// OneLogin username or email address
    pub username: String,
    /// {subdomain}.onelogin.com
    pub subdomain: String,
    /// MFA device_id to use by default
    pub mfa: Option<i64>,
    pub ip_address: Option<String>,
    /// Default lifetime of AWS credentials, in seconds
    #[serde(default = "default_duration")]
    pub duration: i32,

    /// AWS account ID to display name
    #[serde(default)]
    pub accounts: std::collections::BTreeMap<u64, String>,
    /// OneLogin app ID to app
    #[serde(default)]
    pub apps: std::collections::BTreeMap<u32, AppConfig>,
}

fn default_onelogin_region() -> String {
    DEFAULT_ONELOGIN_REGION.to_owned()
}

fn default_duration() -> i32 {
    DEFAULT_DURATION_SECONDS
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct RoleConfig {
    pub arn: String,
    pub profile: String,
    /// Default AWS region for the role
    pub region: Option<String>,
}

/// What an alias points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAlias {
    pub alias: String,
    pub app_id: u32,
    pub role_arn: String,
    pub region: String,
}

/// One row of `list`
#[derive(Debug, Clone)]
pub struct FlatRole {
    pub account_id: Option<u64>,
    pub account_name: Option<String>,
    pub app_id: u32,
    pub app_name: String,
    pub app_alias: String,
    pub arn: String,
    pub profile: String,
    pub region: Option<String>,
}

impl Config {
    pub async fn read_from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let data = tokio::fs::read(&path).await.map_err(|e| {
            crate::Error::ConfigError(format!(
                "Unable to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut parsed = Self::from_yaml_slice(&data)?;
        parsed.config_path = path.as_ref().into();
        Ok(parsed)
    }

    pub fn from_yaml_slice(data: &[u8]) -> crate::Result<Self> {
        let parsed: Self = serde_yaml::from_slice(data)?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !matches!(self.region.as_str(), "us" | "eu") {
            return Err(crate::Error::ConfigError(format!(
                "region must be us or eu, got '{}'",
                self.region
            )));
        }
        if self.username.is_empty() {
            return Err(crate::Error::ConfigError("username is missing".to_owned()));
        }
        if self.subdomain.is_empty() {
            return Err(crate::Error::ConfigError("subdomain is missing".to_owned()));
        }
        crate::federation::validate_duration(self.duration)?;
        Ok(())
    }

    pub fn base_url(&self) -> crate::Result<url::Url> {
        match self.api_url {
            Some(ref u) => Ok(u.clone()),
            None => Ok(url::Url::parse(&format!(
                "https://api.{}.onelogin.com",
                self.region
            ))?),
        }
    }

    /// Finds the app and role for a role profile name or a role ARN.
    pub fn resolve(&self, alias: &str) -> crate::Result<ResolvedAlias> {
        for (app_id, app) in self.apps.iter() {
            for role in app.roles.iter() {
                if role.profile != alias && role.arn != alias {
                    continue;
                }
                let region = match role.region {
                    Some(ref r) if !r.is_empty() => r.clone(),
                    _ => {
                        tracing::warn!(
                            alias = alias,
                            "role has no default region set, falling back to {DEFAULT_AWS_REGION}"
                        );
                        DEFAULT_AWS_REGION.to_owned()
                    }
                };
                return Ok(ResolvedAlias {
                    alias: alias.to_owned(),
                    app_id: *app_id,
                    role_arn: role.arn.clone(),
                    region,
                });
            }
        }
        Err(crate::Error::ConfigError(format!(
            "Unable to find role with alias or ARN: {alias}"
        )))
    }

    pub fn flat_roles(&self) -> Vec<FlatRole> {
        let mut rows = vec![];
        for (app_id, app) in self.apps.iter() {
            for role in app.roles.iter() {
                let account_id = match account_from_arn(&role.arn) {
                    Ok(a) => Some(a),
                    Err(e) => {
                        tracing::warn!(arn = %role.arn, err = %e, "Unable to get AWS account id for role");
                        None
                    }
                };
                rows.push(FlatRole {
                    account_id,
                    account_name: account_id.and_then(|a| self.accounts.get(&a).cloned()),
                    app_id: *app_id,
                    app_name: app.name.clone(),
                    app_alias: app.alias.clone(),
                    arn: role.arn.clone(),
                    profile: role.profile.clone(),
                    region: role.region.clone(),
                });
            }
        }
        rows
    }
}

/// Parses the AWS account id out of an ARN (`arn:aws:iam::{account}:...`).
pub fn account_from_arn(arn: &str) -> crate::Result<u64> {
    let fields: Vec<&str> = arn.split(':').collect();
    let account = fields.get(4).copied().unwrap_or_default();
    if fields.len() < 6 || account.is_empty() {
        return Err(crate::Error::ConfigError(format!("unable to parse {arn}")));
    }
    account
        .parse()
        .map_err(|e| crate::Error::ConfigError(format!("unable to parse {arn}: {e}")))
}
