const OAUTH_CONFIG_KEY: &str = "oauth:config";

fn profile_key(alias: &str) -> String {
    format!("profile:{alias}")
}

/// Key/value persistence for the OneLogin API credentials and per-alias AWS sessions
#[allow(async_fn_in_trait)]
pub trait SecretStore {
    async fn get(&self, key: &str) -> crate::Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8]) -> crate::Result<()>;

    async fn load_session(
        &self,
        alias: &str,
    ) -> crate::Result<Option<crate::credentials::TemporaryCredential>> {
        let Some(data) = self.get(&profile_key(alias)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&data) {
            Ok(c) => Ok(Some(c)),
            Err(e) => {
                tracing::warn!(alias = alias, err = %e, "Stored session is unreadable, ignoring");
                Ok(None)
            }
        }
    }

    async fn save_session(
        &self,
        alias: &str,
        credential: &crate::credentials::TemporaryCredential,
    ) -> crate::Result<()> {
        let data = zeroize::Zeroizing::new(serde_json::to_vec(credential)?);
        self.set(&profile_key(alias), &data).await
    }

    /// Tombstones the stored session for `alias`; see [crate::credentials::TemporaryCredential::flush].
    async fn flush_session(&self, alias: &str, now: chrono::DateTime<chrono::Utc>) -> crate::Result<()> {
        let Some(mut credential) = self.load_session(alias).await? else {
            return Err(crate::Error::UserError(format!(
                "No stored credentials for profile {alias}"
            )));
        };
        credential.flush(now);
        self.save_session(alias, &credential).await
    }

    /// `OL_CLIENT_ID`/`OL_CLIENT_SECRET` win over the stored configuration.
    async fn load_oauth_config(&self) -> crate::Result<crate::ext_oauth2::OAuthConfig> {
        if let Some(c) = crate::ext_oauth2::OAuthConfig::from_env()? {
            tracing::debug!("using OneLogin API credentials from environment");
            return Ok(c);
        }
        let Some(data) = self.get(OAUTH_CONFIG_KEY).await? else {
            return Err(crate::Error::ConfigError(
                "OneLogin API credentials are not configured; run `oauth set`".to_owned(),
            ));
        };
        let c: crate::ext_oauth2::OAuthConfig = serde_json::from_slice(&data)?;
        crate::ext_oauth2::OAuthConfig::new(c.client_id.as_str().to_owned(), c.secret.secret().to_owned())
    }

    async fn save_oauth_config(&self, config: &crate::ext_oauth2::OAuthConfig) -> crate::Result<()> {
        let data = zeroize::Zeroizing::new(serde_json::to_vec(config)?);
        self.set(OAUTH_CONFIG_KEY, &data).await
    }
}

/// Secret store using the OS keyring
///
/// - macOS: Keychain
/// - Linux: Secret Service (GNOME Keyring, KWallet)
/// - Windows: Credential Manager
///
/// Every key is a separate entry under one service name.
pub struct KeyringSecretStore {
    service: String,
    entries: std::sync::Mutex<std::collections::HashMap<String, keyring::Entry>>,
}

impl std::fmt::Debug for KeyringSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringSecretStore")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

impl KeyringSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Default::default(),
        }
    }

    fn with_entry<T>(
        &self,
        key: &str,
        f: impl FnOnce(&keyring::Entry) -> keyring::Result<T>,
    ) -> crate::Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| crate::Error::SecretStoreError("keyring lock poisoned".to_owned()))?;
        let entry = match entries.entry(key.to_owned()) {
            std::collections::hash_map::Entry::Occupied(o) => o.into_mut(),
            std::collections::hash_map::Entry::Vacant(v) => {
                let entry = keyring::Entry::new(&self.service, key).map_err(|e| {
                    crate::Error::SecretStoreError(format!("Failed to access keyring: {e}"))
                })?;
                v.insert(entry)
            }
        };
        f(entry).map_err(|e| crate::Error::SecretStoreError(format!("{key}: {e}")))
    }
}

impl SecretStore for KeyringSecretStore {
    async fn get(&self, key: &str) -> crate::Result<Option<Vec<u8>>> {
        self.with_entry(key, |entry| match entry.get_secret() {
            Ok(data) => Ok(Some(data)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
    }

    async fn set(&self, key: &str, value: &[u8]) -> crate::Result<()> {
        tracing::debug!(service = %self.service, key = key, "storing secret in keyring");
        self.with_entry(key, |entry| entry.set_secret(value))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Keyring store on the in-process mock backend.
    pub(crate) fn mock_store() -> KeyringSecretStore {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        KeyringSecretStore::new("onelogin-aws-role-test")
    }

    fn cred() -> crate::credentials::TemporaryCredential {
        crate::credentials::TemporaryCredential {
            role_arn: "arn:aws:iam::111111111111:role/Foo".to_owned(),
            access_key_id: "ASIAEXAMPLE".to_owned(),
            secret_access_key: "secret".into(),
            session_token: "token".into(),
            expiration: chrono::Utc::now() + chrono::TimeDelta::hours(1),
            region: "us-east-1".to_owned(),
            issuer: "".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_get_set() {
        let s = mock_store();
        assert_eq!(s.get("k").await.unwrap(), None);
        s.set("k", b"v1").await.unwrap();
        s.set("k", b"v2").await.unwrap();
        assert_eq!(s.get("k").await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(s.get("other").await.unwrap(), None);
    }

    #[test]
    fn test_default_service_name() {
        let s = KeyringSecretStore::default();
        assert_eq!(s.service, "onelogin-aws-role");
    }

    mod session {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn round_trip() {
            let s = mock_store();
            assert!(s.load_session("prod").await.unwrap().is_none());
            let c = cred();
            s.save_session("prod", &c).await.unwrap();
            let got = s.load_session("prod").await.unwrap().unwrap();
            assert_eq!(got.access_key_id, c.access_key_id);
            assert_eq!(got.expiration, c.expiration);
        }

        #[tokio::test]
        async fn flush() {
            let s = mock_store();
            s.save_session("prod", &cred()).await.unwrap();
            let now = chrono::Utc::now();
            s.flush_session("prod", now).await.unwrap();
            let got = s.load_session("prod").await.unwrap().unwrap();
            assert!(got.expired());
            assert_eq!(got.expiration, now);
        }

        #[tokio::test]
        async fn flush_unknown() {
            let s = mock_store();
            assert!(matches!(
                s.flush_session("nope", chrono::Utc::now()).await,
                Err(crate::Error::UserError(_))
            ));
        }

        #[tokio::test]
        async fn unreadable() {
            let s = mock_store();
            s.set("profile:prod", b"garbage").await.unwrap();
            assert!(s.load_session("prod").await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_oauth_config_kept_in_keyring() {
        let s = mock_store();
        let c = crate::ext_oauth2::OAuthConfig::new("a".repeat(64), "b".repeat(64)).unwrap();
        s.save_oauth_config(&c).await.unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&s.get(OAUTH_CONFIG_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(raw["clientid"], "a".repeat(64));
        assert_eq!(raw["secret"], "b".repeat(64));
    }
}
