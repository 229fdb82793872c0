//! Drives a OneLogin login to a SAML assertion: cache lookup, password entry, MFA device
//! selection and resolution, and committing the result to the assertion cache.

/// Who to authenticate and for which app
#[derive(Debug, Clone)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub subdomain: &'a str,
    pub app_id: u32,
    pub ip_address: Option<&'a str>,
    /// Preferred MFA device; prompts among the offered devices when unset
    pub mfa_device: Option<i64>,
}

impl<'a> LoginRequest<'a> {
    pub fn from_config(config: &'a crate::config::Config, app_id: u32) -> Self {
        Self {
            username: &config.username,
            subdomain: &config.subdomain,
            app_id,
            ip_address: config.ip_address.as_deref(),
            mfa_device: config.mfa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Authenticating,
    MfaPending,
    DeviceSelected { device_id: i64, kind: crate::mfa::MfaKind },
    Resolving,
    Done,
}

pub struct SamlSession<'a, P: crate::prompt::Prompter + ?Sized> {
    client: &'a mut crate::onelogin::Client,
    prompter: &'a P,
    state: State,
    pub code_attempts: u32,
    pub push_tries: u32,
    pub poll_interval: std::time::Duration,
}

impl<'a, P: crate::prompt::Prompter + ?Sized> SamlSession<'a, P> {
    pub fn new(client: &'a mut crate::onelogin::Client, prompter: &'a P) -> Self {
        Self {
            client,
            prompter,
            state: State::Init,
            code_attempts: crate::mfa::DEFAULT_CODE_ATTEMPTS,
            push_tries: crate::mfa::DEFAULT_PUSH_TRIES,
            poll_interval: crate::mfa::DEFAULT_POLL_INTERVAL,
        }
    }

    fn transition(&mut self, next: State) {
        tracing::debug!(from = ?self.state, to = ?next, "saml session");
        self.state = next;
    }

    /// Returns a usable assertion for `req.app_id`. An unexpired cached one is returned without
    /// prompting; otherwise the user is asked for a password until OneLogin accepts it or they
    /// enter nothing.
    #[tracing::instrument(skip_all, fields(app_id = req.app_id))]
    pub async fn login(&mut self, req: &LoginRequest<'_>) -> crate::Result<crate::saml::SamlAssertion> {
        if let Ok((assertion, _)) = self.client.cache().assertion(req.app_id) {
            tracing::debug!("cached SAML assertion is still valid");
            self.transition(State::Done);
            return Ok(assertion);
        }

        self.transition(State::Authenticating);
        let outcome = loop {
            let password = self
                .prompter
                .password(&format!("OneLogin password for {}", req.username))?;
            {
                use secrecy::ExposeSecret;
                if password.expose_secret().is_empty() {
                    return Err(crate::Error::AuthAborted);
                }
            }
            match self
                .client
                .request_assertion(
                    req.username,
                    &password,
                    req.subdomain,
                    req.app_id,
                    req.ip_address,
                )
                .await
            {
                Ok(o) => break o,
                Err(e) => {
                    tracing::error!(err = %e, "OneLogin authentication failed");
                    self.prompter
                        .notice("Authentication failed, try again (empty password to abort)");
                }
            }
        };

        let assertion = match outcome {
            crate::onelogin::AssertionOutcome::Cached(a)
            | crate::onelogin::AssertionOutcome::Direct(a) => a,
            crate::onelogin::AssertionOutcome::MfaRequired(challenge) => {
                self.transition(State::MfaPending);
                let a = self.resolve_mfa(req, challenge).await?;
                self.client.commit_assertion(req.app_id, &a).await?;
                a
            }
        };
        self.transition(State::Done);
        Ok(assertion)
    }

    async fn resolve_mfa(
        &mut self,
        req: &LoginRequest<'_>,
        challenge: crate::mfa::MfaChallengeState,
    ) -> crate::Result<crate::saml::SamlAssertion> {
        let device_id = challenge.select_device(req.mfa_device, self.prompter)?;
        let kind = challenge.kind_of(device_id)?;
        self.transition(State::DeviceSelected { device_id, kind });
        let device_label = challenge
            .device(device_id)
            .map(ToString::to_string)
            .unwrap_or_default();

        self.transition(State::Resolving);
        let mfa = crate::mfa::MfaChallenge::new(&*self.client, challenge, req.app_id);
        let outcome = match kind {
            crate::mfa::MfaKind::Push => {
                self.prompter
                    .notice(&format!("Approve the login on {device_label}"));
                mfa.push_and_poll(device_id, self.push_tries, self.poll_interval)
                    .await?
            }
            crate::mfa::MfaKind::Code => {
                code_loop(&mfa, self.prompter, device_id, &device_label, self.code_attempts)
                    .await?
            }
        };

        match outcome {
            crate::mfa::MfaOutcome::Resolved(a) => Ok(a),
            crate::mfa::MfaOutcome::Rejected => Err(crate::Error::MfaFailed(format!(
                "no valid code entered for {device_label} after {} attempts",
                self.code_attempts
            ))),
            crate::mfa::MfaOutcome::TimedOut => Err(crate::Error::MfaFailed(format!(
                "push to {device_label} was not approved in time"
            ))),
        }
    }
}

async fn code_loop<P: crate::prompt::Prompter + ?Sized>(
    mfa: &crate::mfa::MfaChallenge<'_>,
    prompter: &P,
    device_id: i64,
    device_label: &str,
    attempts: u32,
) -> crate::Result<crate::mfa::MfaOutcome> {
    for attempt in 1..=attempts {
        let code = prompter.text(&format!("MFA code from {device_label}"))?;
        let code = code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            tracing::debug!(attempt = attempt, "MFA code is not numeric");
            prompter.notice("Invalid MFA code, it must be numeric");
            continue;
        }
        match mfa.submit_code(device_id, code).await? {
            crate::mfa::MfaOutcome::Resolved(a) => return Ok(crate::mfa::MfaOutcome::Resolved(a)),
            _ => {
                tracing::debug!(attempt = attempt, attempts = attempts, "MFA code rejected");
                prompter.notice("Invalid MFA code");
            }
        }
    }
    Ok(crate::mfa::MfaOutcome::Rejected)
}
