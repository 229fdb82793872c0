//! OneLogin API client: client-credentials token grant, SAML assertion requests and the
//! MFA callback transport.

const TOKEN_PATH: &str = "auth/oauth2/v2/token";
const SAML_ASSERTION_PATH: &str = "api/2/saml_assertion";

/// User snapshot returned alongside assertions and MFA challenges
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct OneLoginUser {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

#[serde_with::serde_as]
#[derive(serde::Serialize)]
struct SamlAssertionRequest<'a> {
    username_or_email: &'a str,
    password: &'a str,
    subdomain: &'a str,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    app_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<&'a str>,
}

/// Both response shapes of the assertion and MFA callback endpoints, before classification
#[derive(Debug, serde::Deserialize)]
struct SamlResponseBody {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<OneLoginUser>,
    #[serde(default)]
    state_token: Option<secrecy::SecretString>,
    #[serde(default)]
    devices: Option<Vec<crate::mfa::MfaDevice>>,
    #[serde(default)]
    callback_url: Option<url::Url>,
}

/// A response from the assertion or MFA callback endpoints
#[derive(Debug)]
pub(crate) enum SamlResponse {
    Assertion(crate::saml::SamlAssertion),
    MfaRequired(crate::mfa::MfaChallengeState),
    /// Neither `data` nor a challenge; MFA verification still waiting or refused
    Pending { message: String },
}

impl TryFrom<SamlResponseBody> for SamlResponse {
    type Error = crate::Error;

    fn try_from(body: SamlResponseBody) -> crate::Result<Self> {
        if let Some(data) = body.data.filter(|d| !d.is_empty()) {
            return Ok(Self::Assertion(crate::saml::SamlAssertion::from_base64(
                &data,
            )?));
        }
        if let (Some(state_token), Some(callback_url)) = (body.state_token, body.callback_url) {
            return Ok(Self::MfaRequired(crate::mfa::MfaChallengeState {
                state_token,
                devices: body.devices.unwrap_or_default(),
                callback_url,
                user: body.user,
            }));
        }
        Ok(Self::Pending {
            message: body.message.unwrap_or_default(),
        })
    }
}

/// Result of [Client::request_assertion]
#[derive(Debug)]
pub enum AssertionOutcome {
    /// Unexpired assertion from the cache; no request was made
    Cached(crate::saml::SamlAssertion),
    /// Issued without MFA and already committed to the cache
    Direct(crate::saml::SamlAssertion),
    MfaRequired(crate::mfa::MfaChallengeState),
}

/// Authenticated OneLogin API client. Holds the cache so assertion lookups and token reuse
/// go through the same store.
pub struct Client {
    base_url: url::Url,
    access_token: secrecy::SecretString,
    cache: crate::cache::CacheStore,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("cache", &self.cache)
            .finish()
    }
}

impl Client {
    /// Reuses the cached access token when still valid, otherwise runs the client-credentials
    /// grant and stores the new token.
    #[tracing::instrument(skip_all, fields(base_url = %base_url))]
    pub async fn bootstrap(
        oauth: &crate::ext_oauth2::OAuthConfig,
        base_url: url::Url,
        mut cache: crate::cache::CacheStore,
    ) -> crate::Result<Self> {
        match cache.access_token() {
            Ok(access_token) => {
                tracing::debug!("using cached OneLogin access token");
                return Ok(Self {
                    base_url,
                    access_token,
                    cache,
                });
            }
            Err(e) if e.is_cache_miss() => {
                tracing::debug!(reason = %e, "requesting a new OneLogin access token");
            }
            Err(e) => return Err(e),
        }

        let url = endpoint(&base_url, TOKEN_PATH)?;
        let resp = crate::client::http()
            .post(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .basic_auth(oauth.client_id.as_str(), Some(oauth.secret.secret()))
            .json(&crate::ext_oauth2::ClientCredentialsRequest::default())
            .send()
            .await?;
        let resp = match crate::client::check_provider_response(&url, resp).await {
            Ok(r) => r,
            Err(crate::Error::ProviderError {
                status_code,
                message,
                ..
            }) => {
                return Err(crate::Error::AuthError(format!(
                    "Unable to authenticate with client_id {}: {status_code}; {message}",
                    oauth.client_id.as_str()
                )))
            }
            Err(e) => return Err(e),
        };
        let body: crate::ext_oauth2::OneLoginTokenResponse = resp.json().await?;
        let token = crate::token::AccessToken::from_token_response(body, chrono::Utc::now());
        tracing::info!(expires_at = %token.expires_at(), "obtained OneLogin access token");

        let access_token = token.access_token.clone();
        if let Err(e) = cache.put_access_token(token).await {
            tracing::warn!(err = %e, "Unable to save OneLogin access token");
        }
        Ok(Self {
            base_url,
            access_token,
            cache,
        })
    }

    pub fn cache(&self) -> &crate::cache::CacheStore {
        &self.cache
    }

    /// Returns a cached assertion when one is unexpired; otherwise authenticates the user.
    #[tracing::instrument(skip(self, password))]
    pub async fn request_assertion(
        &mut self,
        username: &str,
        password: &secrecy::SecretString,
        subdomain: &str,
        app_id: u32,
        ip_address: Option<&str>,
    ) -> crate::Result<AssertionOutcome> {
        use secrecy::ExposeSecret;

        match self.cache.assertion(app_id) {
            Ok((assertion, _)) => {
                tracing::debug!(app_id = app_id, "using cached SAML assertion");
                return Ok(AssertionOutcome::Cached(assertion));
            }
            Err(e) if e.is_cache_miss() => {
                tracing::debug!(app_id = app_id, reason = %e, "no usable cached SAML assertion");
            }
            Err(e) => return Err(e),
        }

        let url = endpoint(&self.base_url, SAML_ASSERTION_PATH)?;
        let req = SamlAssertionRequest {
            username_or_email: username,
            password: password.expose_secret(),
            subdomain,
            app_id,
            ip_address,
        };
        let resp = self.post(&url, &req).await.map_err(|e| match e {
            crate::Error::ProviderError {
                status_code,
                message,
                ..
            } if matches!(status_code.as_u16(), 400 | 401 | 403) => {
                crate::Error::AuthRejected(format!("{status_code}; {message}"))
            }
            e => e,
        })?;
        match resp {
            SamlResponse::Assertion(assertion) => {
                self.commit_assertion(app_id, &assertion).await?;
                Ok(AssertionOutcome::Direct(assertion))
            }
            SamlResponse::MfaRequired(state) => {
                tracing::debug!(app_id = app_id, devices = ?state.devices, "MFA required");
                Ok(AssertionOutcome::MfaRequired(state))
            }
            SamlResponse::Pending { message } => Err(crate::Error::DecodeError(format!(
                "SAML assertion response carried neither an assertion nor an MFA challenge: {message}"
            ))),
        }
    }

    /// Posts to an MFA `callback_url`.
    pub(crate) async fn post_callback<T: serde::Serialize>(
        &self,
        callback_url: &url::Url,
        body: &T,
    ) -> crate::Result<SamlResponse> {
        self.post(callback_url, body).await
    }

    /// Stores a freshly issued assertion. An assertion that can't be parsed is an error; failing
    /// to write the cache file is only logged.
    pub(crate) async fn commit_assertion(
        &mut self,
        app_id: u32,
        assertion: &crate::saml::SamlAssertion,
    ) -> crate::Result<()> {
        match self.cache.put_assertion(app_id, assertion).await {
            Ok(()) => Ok(()),
            Err(crate::Error::IoError(e)) => {
                tracing::warn!(app_id = app_id, path = %self.cache.path().display(), err = %e, "Unable to save SAML assertion cache");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn post<T: serde::Serialize>(
        &self,
        url: &url::Url,
        body: &T,
    ) -> crate::Result<SamlResponse> {
        use secrecy::ExposeSecret;
        let resp = crate::client::http()
            .post(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await?;
        let resp = crate::client::check_provider_response(url, resp).await?;
        let body: SamlResponseBody = resp.json().await.map_err(|e| {
            crate::Error::DecodeError(format!("Unable to decode response from {url}: {e}"))
        })?;
        body.try_into()
    }
}

/// Appends `path` to the API base, keeping any path prefix of `api_url`.
fn endpoint(base_url: &url::Url, path: &str) -> crate::Result<url::Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| crate::Error::ConfigError(format!("{base_url} cannot be used as api_url")))?
        .pop_if_empty()
        .extend(path.split('/'));
    Ok(url)
}
