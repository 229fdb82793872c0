/// SAML assertion cached for one OneLogin app
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AssertionRecord {
    /// Unix seconds; the assertion is unusable from this instant on
    #[serde(rename = "NotOnOrAfter")]
    pub not_on_or_after: i64,
    #[serde(rename = "Assertion")]
    pub assertion: String,
    #[serde(rename = "Roles", default)]
    pub roles: Vec<String>,
}

impl AssertionRecord {
    fn is_expired_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        now.timestamp() >= self.not_on_or_after
    }
}

/// On-disk document, rewritten wholesale on every save
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
struct CacheDocument {
    #[serde(default)]
    assertion: std::collections::HashMap<String, AssertionRecord>,
    #[serde(default)]
    accesstoken: Option<crate::token::AccessToken>,
}

/// Persistent cache of the OneLogin access token and per-app SAML assertions.
///
/// A missing or unreadable file loads as an empty cache. Concurrent invocations are not
/// coordinated; the last writer wins.
pub struct CacheStore {
    path: std::path::PathBuf,
    doc: CacheDocument,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("path", &self.path)
            .field("assertions", &self.doc.assertion.len())
            .finish()
    }
}

impl CacheStore {
    pub async fn load(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(data) => match serde_json::from_slice::<CacheDocument>(&data) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::debug!(path = %path.display(), err = %e, "Corrupted cache file, starting over");
                    CacheDocument::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheDocument::default(),
            Err(e) => {
                tracing::debug!(path = %path.display(), err = %e, "Unable to read cache file, starting over");
                CacheDocument::default()
            }
        };
        Self { path, doc }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub async fn save(&self) -> crate::Result<()> {
        tracing::debug!(path = %self.path.display(), "saving cache");
        let mut data = serde_json::to_vec(&self.doc)?;
        data.push(b'\n');
        crate::utils::write_private_file(&self.path, &data).await?;
        Ok(())
    }

    pub fn access_token_record(&self) -> Option<&crate::token::AccessToken> {
        self.doc.accesstoken.as_ref()
    }

    pub fn access_token_at(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> crate::Result<secrecy::SecretString> {
        let Some(ref token) = self.doc.accesstoken else {
            return Err(crate::Error::NotFound(
                "No current OAuth2 AccessToken".to_owned(),
            ));
        };
        if !token.is_valid_at(now) {
            return Err(crate::Error::Expired(
                "OAuth2 AccessToken has expired".to_owned(),
            ));
        }
        Ok(token.access_token.clone())
    }

    pub fn access_token(&self) -> crate::Result<secrecy::SecretString> {
        self.access_token_at(chrono::Utc::now())
    }

    /// Replaces the stored token. The in-memory copy is updated even if writing fails.
    pub async fn put_access_token(&mut self, token: crate::token::AccessToken) -> crate::Result<()> {
        self.doc.accesstoken = Some(token);
        self.save().await
    }

    pub fn assertion_at(
        &self,
        app_id: u32,
        now: chrono::DateTime<chrono::Utc>,
    ) -> crate::Result<(crate::saml::SamlAssertion, Vec<String>)> {
        let Some(record) = self.doc.assertion.get(&app_id.to_string()) else {
            return Err(crate::Error::NotFound(format!(
                "Unable to find assertion {app_id}"
            )));
        };
        if record.is_expired_at(now) {
            return Err(crate::Error::Expired(format!(
                "SAML Assertion for {app_id} has expired"
            )));
        }
        Ok((
            crate::saml::SamlAssertion::new(record.assertion.clone()),
            record.roles.clone(),
        ))
    }

    pub fn assertion(
        &self,
        app_id: u32,
    ) -> crate::Result<(crate::saml::SamlAssertion, Vec<String>)> {
        self.assertion_at(app_id, chrono::Utc::now())
    }

    /// Stores an assertion after reading its roles and expiry out of the XML, then persists.
    pub async fn put_assertion(
        &mut self,
        app_id: u32,
        assertion: &crate::saml::SamlAssertion,
    ) -> crate::Result<()> {
        let roles = assertion.roles()?;
        let not_on_or_after = assertion.not_on_or_after()?;
        tracing::debug!(app_id = app_id, roles = ?roles, not_on_or_after = %not_on_or_after, "caching SAML assertion");
        self.doc.assertion.insert(
            app_id.to_string(),
            AssertionRecord {
                not_on_or_after: not_on_or_after.timestamp(),
                assertion: assertion.as_str().to_owned(),
                roles,
            },
        );
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saml::tests::assertion_xml;
    use pretty_assertions::assert_eq;

    const FOO: &str =
        "arn:aws:iam::111111111111:role/Foo,arn:aws:iam::111111111111:saml-provider/IdP";

    fn future() -> String {
        (chrono::Utc::now() + chrono::TimeDelta::hours(1))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string()
    }

    fn token(expires_in: i64) -> crate::token::AccessToken {
        crate::token::AccessToken {
            access_token: "tok".into(),
            created_at: chrono::Utc::now(),
            expires_in,
            token_type: oauth2::basic::BasicTokenType::Bearer,
            account_id: Some(1),
        }
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let c = CacheStore::load(dir.path().join("nope.json")).await;
        assert!(matches!(c.access_token(), Err(crate::Error::NotFound(_))));
        assert!(matches!(c.assertion(1), Err(crate::Error::NotFound(_))));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_is_quiet_at_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let c = CacheStore::load(&path).await;
        assert!(matches!(c.access_token(), Err(crate::Error::NotFound(_))));
        assert!(log.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, b"{\"assertion\": {").await.unwrap();
        let mut c = CacheStore::load(&path).await;
        assert!(c.access_token().is_err());

        c.put_access_token(token(600)).await.unwrap();
        let c = CacheStore::load(&path).await;
        assert!(c.access_token().is_ok());
    }

    #[tokio::test]
    async fn test_access_token_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = CacheStore::load(dir.path().join("cache.json")).await;
        let t = token(600);
        let created_at = t.created_at;
        c.put_access_token(t).await.unwrap();
        assert!(c.access_token_at(created_at).is_ok());
        assert!(matches!(
            c.access_token_at(created_at + chrono::TimeDelta::seconds(600)),
            Err(crate::Error::Expired(_))
        ));
    }

    #[tokio::test]
    async fn test_assertion_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let a = crate::saml::SamlAssertion::new(assertion_xml(&future(), &[FOO]));

        let mut c = CacheStore::load(&path).await;
        c.put_assertion(123, &a).await.unwrap();

        let c = CacheStore::load(&path).await;
        let (got, roles) = c.assertion(123).unwrap();
        assert_eq!(got, a);
        assert_eq!(roles, vec!["arn:aws:iam::111111111111:role/Foo".to_owned()]);
        assert!(matches!(c.assertion(124), Err(crate::Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_assertion_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let a = crate::saml::SamlAssertion::new(assertion_xml(&future(), &[FOO]));

        let mut c = CacheStore::load(&path).await;
        c.put_assertion(123, &a).await.unwrap();
        let first = c.assertion(123).unwrap();
        c.put_assertion(123, &a).await.unwrap();
        assert_eq!(c.assertion(123).unwrap(), first);
    }

    #[tokio::test]
    async fn test_assertion_expired() {
        let dir = tempfile::tempdir().unwrap();
        let a = crate::saml::SamlAssertion::new(assertion_xml("2021-03-04T05:06:07Z", &[FOO]));
        let mut c = CacheStore::load(dir.path().join("cache.json")).await;
        c.put_assertion(9, &a).await.unwrap();

        let nooa = chrono::DateTime::from_timestamp(1614834367, 0).unwrap();
        assert!(c
            .assertion_at(9, nooa - chrono::TimeDelta::seconds(1))
            .is_ok());
        assert!(matches!(
            c.assertion_at(9, nooa),
            Err(crate::Error::Expired(_))
        ));
        assert!(matches!(c.assertion(9), Err(crate::Error::Expired(_))));
    }

    #[tokio::test]
    async fn test_put_assertion_unparseable() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = CacheStore::load(dir.path().join("cache.json")).await;
        let a = crate::saml::SamlAssertion::new("<Response/>");
        assert!(c.put_assertion(1, &a).await.is_err());
        assert!(matches!(c.assertion(1), Err(crate::Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let a = crate::saml::SamlAssertion::new(assertion_xml(&future(), &[FOO]));
        let mut c = CacheStore::load(&path).await;
        c.put_access_token(token(600)).await.unwrap();
        c.put_assertion(77, &a).await.unwrap();

        let v: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(v["accesstoken"]["access_token"], "tok");
        assert_eq!(
            v["assertion"]["77"]["Roles"][0],
            "arn:aws:iam::111111111111:role/Foo"
        );
        assert!(v["assertion"]["77"]["NotOnOrAfter"].is_i64());
    }
}
