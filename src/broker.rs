/// Per-request overrides of the configured defaults
#[derive(Debug, Clone, Default)]
pub struct CredentialOptions {
    pub region: Option<String>,
    pub duration: Option<i32>,
    /// Ignore a stored, unexpired session
    pub force: bool,
}

/// Hands out AWS credentials for an alias: a stored session while it lasts, otherwise a fresh
/// OneLogin login and AssumeRoleWithSAML exchange.
pub struct Broker<'a, S, P>
where
    S: crate::secret_store::SecretStore,
    P: crate::prompt::Prompter + ?Sized,
{
    config: &'a crate::config::Config,
    store: &'a S,
    prompter: &'a P,
    cache_path: std::path::PathBuf,
}

impl<'a, S, P> Broker<'a, S, P>
where
    S: crate::secret_store::SecretStore,
    P: crate::prompt::Prompter + ?Sized,
{
    pub fn new(config: &'a crate::config::Config, store: &'a S, prompter: &'a P) -> Self {
        Self {
            config,
            store,
            prompter,
            cache_path: crate::config::cache_path(),
        }
    }

    pub fn with_cache_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn credentials(
        &self,
        alias: &str,
        opts: &CredentialOptions,
    ) -> crate::Result<crate::credentials::TemporaryCredential> {
        let resolved = self.config.resolve(alias)?;
        let region = opts.region.clone().unwrap_or(resolved.region);
        let duration = opts.duration.unwrap_or(self.config.duration);
        crate::federation::validate_duration(duration)?;

        if !opts.force {
            match self.store.load_session(alias).await? {
                Some(mut c) if !c.expired() && c.role_arn == resolved.role_arn => {
                    tracing::debug!(alias = alias, expiration = %c.expiration, "using stored session");
                    c.region = region;
                    return Ok(c);
                }
                Some(c) => {
                    tracing::debug!(alias = alias, expiration = %c.expiration, "stored session is stale");
                }
                None => {}
            }
        }

        let oauth = self.store.load_oauth_config().await?;
        let cache = crate::cache::CacheStore::load(&self.cache_path).await;
        let mut client =
            crate::onelogin::Client::bootstrap(&oauth, self.config.base_url()?, cache).await?;
        let assertion = crate::saml_session::SamlSession::new(&mut client, self.prompter)
            .login(&crate::saml_session::LoginRequest::from_config(
                self.config,
                resolved.app_id,
            ))
            .await?;

        let credential =
            crate::federation::exchange(&assertion, &resolved.role_arn, &region, duration).await?;
        self.store.save_session(alias, &credential).await?;
        Ok(credential)
    }
}
