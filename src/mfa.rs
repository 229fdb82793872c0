/// Device type that gets push notifications; every other type takes a typed code.
pub const ONELOGIN_PROTECT: &str = "OneLogin Protect";

pub const DEFAULT_CODE_ATTEMPTS: u32 = 10;
pub const DEFAULT_PUSH_TRIES: u32 = 10;
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct MfaDevice {
    pub device_type: String,
    pub device_id: i64,
}

impl MfaDevice {
    pub fn kind(&self) -> MfaKind {
        if self.device_type == ONELOGIN_PROTECT {
            MfaKind::Push
        } else {
            MfaKind::Code
        }
    }
}

impl std::fmt::Display for MfaDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.device_type, self.device_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MfaKind {
    Push,
    Code,
}

/// Pending MFA challenge. Lives for a single authentication attempt.
#[derive(Debug)]
pub struct MfaChallengeState {
    pub state_token: secrecy::SecretString,
    pub devices: Vec<MfaDevice>,
    pub callback_url: url::Url,
    pub user: Option<crate::onelogin::OneLoginUser>,
}

impl MfaChallengeState {
    pub fn device(&self, device_id: i64) -> Option<&MfaDevice> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }

    pub fn kind_of(&self, device_id: i64) -> crate::Result<MfaKind> {
        self.device(device_id)
            .map(MfaDevice::kind)
            .ok_or(crate::Error::InvalidDevice(device_id))
    }

    /// `configured` must name one of the offered devices. Without it a lone device is used
    /// as is and several are offered to the user.
    pub fn select_device(
        &self,
        configured: Option<i64>,
        prompter: &(impl crate::prompt::Prompter + ?Sized),
    ) -> crate::Result<i64> {
        if self.devices.is_empty() {
            return Err(crate::Error::MfaFailed(
                "no MFA devices are registered for this user".to_owned(),
            ));
        }
        if let Some(id) = configured {
            return self
                .device(id)
                .map(|d| d.device_id)
                .ok_or(crate::Error::InvalidDevice(id));
        }
        if let [only] = self.devices.as_slice() {
            tracing::debug!(device = %only, "only one MFA device, selecting it");
            return Ok(only.device_id);
        }
        let options: Vec<String> = self.devices.iter().map(ToString::to_string).collect();
        let idx = prompter.select("Select MFA device", &options)?;
        Ok(self.devices[idx].device_id)
    }
}

/// Terminal result of resolving a challenge
#[derive(Debug)]
pub enum MfaOutcome {
    Resolved(crate::saml::SamlAssertion),
    Rejected,
    TimedOut,
}

#[serde_with::serde_as]
#[derive(serde::Serialize)]
struct VerifyCodeRequest<'a> {
    state_token: &'a str,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    device_id: i64,
    otp_token: &'a str,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    app_id: u32,
}

#[serde_with::serde_as]
#[derive(serde::Serialize)]
struct PushRequest<'a> {
    state_token: &'a str,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    device_id: i64,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    do_not_notify: bool,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    app_id: u32,
}

/// A challenge bound to the client that received it
pub struct MfaChallenge<'a> {
    client: &'a crate::onelogin::Client,
    state: MfaChallengeState,
    app_id: u32,
}

impl<'a> MfaChallenge<'a> {
    pub fn new(client: &'a crate::onelogin::Client, state: MfaChallengeState, app_id: u32) -> Self {
        Self {
            client,
            state,
            app_id,
        }
    }

    /// Submits one code. Anything short of an assertion, including a 400/401/403, is a
    /// rejection the caller may retry.
    #[tracing::instrument(skip(self, code))]
    pub async fn submit_code(&self, device_id: i64, code: &str) -> crate::Result<MfaOutcome> {
        use secrecy::ExposeSecret;
        let req = VerifyCodeRequest {
            state_token: self.state.state_token.expose_secret(),
            device_id,
            otp_token: code,
            app_id: self.app_id,
        };
        match self
            .client
            .post_callback(&self.state.callback_url, &req)
            .await
        {
            Ok(crate::onelogin::SamlResponse::Assertion(a)) => Ok(MfaOutcome::Resolved(a)),
            Ok(other) => {
                tracing::debug!(response = ?other, "MFA code was not accepted");
                Ok(MfaOutcome::Rejected)
            }
            Err(crate::Error::ProviderError {
                status_code, message, ..
            }) if matches!(status_code.as_u16(), 400 | 401 | 403) => {
                tracing::debug!(status_code = ?status_code, message = message, "MFA code was rejected");
                Ok(MfaOutcome::Rejected)
            }
            Err(e) => Err(e),
        }
    }

    /// Triggers a push notification, then polls up to `tries` times, `interval` apart.
    #[tracing::instrument(skip(self))]
    pub async fn push_and_poll(
        &self,
        device_id: i64,
        tries: u32,
        interval: std::time::Duration,
    ) -> crate::Result<MfaOutcome> {
        if let Some(a) = self.push(device_id, false).await? {
            return Ok(MfaOutcome::Resolved(a));
        }
        for attempt in 1..=tries {
            tokio::time::sleep(interval).await;
            if let Some(a) = self.push(device_id, true).await? {
                tracing::debug!(attempt = attempt, "push approved");
                return Ok(MfaOutcome::Resolved(a));
            }
            tracing::debug!(attempt = attempt, tries = tries, "push still pending");
        }
        Ok(MfaOutcome::TimedOut)
    }

    async fn push(
        &self,
        device_id: i64,
        do_not_notify: bool,
    ) -> crate::Result<Option<crate::saml::SamlAssertion>> {
        use secrecy::ExposeSecret;
        let req = PushRequest {
            state_token: self.state.state_token.expose_secret(),
            device_id,
            do_not_notify,
            app_id: self.app_id,
        };
        match self
            .client
            .post_callback(&self.state.callback_url, &req)
            .await?
        {
            crate::onelogin::SamlResponse::Assertion(a) => Ok(Some(a)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onelogin::tests::{challenge_body, client_for, future_xml};
    use crate::prompt::tests::ScriptedPrompter;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VERIFY_PATH: &str = "/api/2/saml_assertion/verify_factor";

    fn state(devices: &[(&str, i64)]) -> MfaChallengeState {
        MfaChallengeState {
            state_token: "st-1".into(),
            devices: devices
                .iter()
                .map(|(t, id)| MfaDevice {
                    device_type: t.to_string(),
                    device_id: *id,
                })
                .collect(),
            callback_url: "https://api.us.onelogin.com/api/2/saml_assertion/verify_factor"
                .parse()
                .unwrap(),
            user: None,
        }
    }

    fn server_state(server: &MockServer, device_type: &str) -> MfaChallengeState {
        let mut s = state(&[(device_type, 7)]);
        s.callback_url = format!("{}{VERIFY_PATH}", server.uri()).parse().unwrap();
        s
    }

    fn data_body() -> serde_json::Value {
        serde_json::json!({
            "data": crate::saml::SamlAssertion::new(future_xml()).to_base64(),
            "message": "Success",
        })
    }

    fn pending_body() -> serde_json::Value {
        serde_json::json!({"message": "Authentication pending on OL Protect"})
    }

    mod select_device {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn single() {
            let p = ScriptedPrompter::new(&[]);
            let s = state(&[("Google Authenticator", 42)]);
            assert_eq!(s.select_device(None, &p).unwrap(), 42);
            assert!(p.asked().is_empty());
        }

        #[test]
        fn prompts_with_several() {
            let p = ScriptedPrompter::new(&["9", "2"]);
            let s = state(&[("Google Authenticator", 42), (ONELOGIN_PROTECT, 43)]);
            assert_eq!(s.select_device(None, &p).unwrap(), 43);
            assert_eq!(p.asked().len(), 2);
        }

        #[test]
        fn configured() {
            let p = ScriptedPrompter::new(&[]);
            let s = state(&[("Google Authenticator", 42), (ONELOGIN_PROTECT, 43)]);
            assert_eq!(s.select_device(Some(42), &p).unwrap(), 42);
            assert!(matches!(
                s.select_device(Some(1), &p),
                Err(crate::Error::InvalidDevice(1))
            ));
        }

        #[test]
        fn none_registered() {
            let p = ScriptedPrompter::new(&[]);
            assert!(matches!(
                state(&[]).select_device(None, &p),
                Err(crate::Error::MfaFailed(_))
            ));
        }
    }

    #[test]
    fn test_kind_of() {
        let s = state(&[("Google Authenticator", 42), (ONELOGIN_PROTECT, 43)]);
        assert_eq!(s.kind_of(42).unwrap(), MfaKind::Code);
        assert_eq!(s.kind_of(43).unwrap(), MfaKind::Push);
        assert!(matches!(s.kind_of(44), Err(crate::Error::InvalidDevice(44))));
    }

    #[test]
    fn test_request_fields_are_strings() {
        let v = serde_json::to_value(PushRequest {
            state_token: "st",
            device_id: 7,
            do_not_notify: true,
            app_id: 123,
        })
        .unwrap();
        assert_eq!(
            v,
            serde_json::json!({"state_token": "st", "device_id": "7", "do_not_notify": "true", "app_id": "123"})
        );
    }

    mod submit_code {
        use super::*;

        #[tokio::test]
        async fn accepted() {
            let server = MockServer::start().await;
            let dir = tempfile::tempdir().unwrap();
            let c = client_for(&server, &dir).await;
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .and(body_partial_json(serde_json::json!({
                    "state_token": "st-1",
                    "device_id": "7",
                    "otp_token": "012345",
                    "app_id": "123",
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(data_body()))
                .expect(1)
                .mount(&server)
                .await;

            let ch = MfaChallenge::new(&c, server_state(&server, "Yubico YubiKey"), 123);
            let outcome = ch.submit_code(7, "012345").await.unwrap();
            assert!(matches!(outcome, MfaOutcome::Resolved(_)));
        }

        #[tokio::test]
        async fn rejected_status() {
            let server = MockServer::start().await;
            let dir = tempfile::tempdir().unwrap();
            let c = client_for(&server, &dir).await;
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .respond_with(ResponseTemplate::new(401).set_body_json(
                    serde_json::json!({"statusCode": 401, "message": "Failed authentication with this factor"}),
                ))
                .mount(&server)
                .await;

            let ch = MfaChallenge::new(&c, server_state(&server, "Yubico YubiKey"), 123);
            assert!(matches!(
                ch.submit_code(7, "000000").await.unwrap(),
                MfaOutcome::Rejected
            ));
        }

        #[tokio::test]
        async fn rejected_without_data() {
            let server = MockServer::start().await;
            let dir = tempfile::tempdir().unwrap();
            let c = client_for(&server, &dir).await;
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
                .mount(&server)
                .await;

            let ch = MfaChallenge::new(&c, server_state(&server, "Yubico YubiKey"), 123);
            assert!(matches!(
                ch.submit_code(7, "000000").await.unwrap(),
                MfaOutcome::Rejected
            ));
        }

        #[tokio::test]
        async fn server_error_propagates() {
            let server = MockServer::start().await;
            let dir = tempfile::tempdir().unwrap();
            let c = client_for(&server, &dir).await;
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;

            let ch = MfaChallenge::new(&c, server_state(&server, "Yubico YubiKey"), 123);
            assert!(matches!(
                ch.submit_code(7, "000000").await,
                Err(crate::Error::ProviderError { .. })
            ));
        }
    }

    mod push_and_poll {
        use super::*;
        use pretty_assertions::assert_eq;

        async fn mount_push(server: &MockServer) {
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .and(body_partial_json(serde_json::json!({"do_not_notify": "false"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(challenge_body(
                    server,
                    serde_json::json!([{"device_type": ONELOGIN_PROTECT, "device_id": 7}]),
                )))
                .expect(1)
                .mount(server)
                .await;
        }

        #[tokio::test]
        async fn approved_after_pending_polls() {
            let server = MockServer::start().await;
            let dir = tempfile::tempdir().unwrap();
            let c = client_for(&server, &dir).await;
            mount_push(&server).await;
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .and(body_partial_json(serde_json::json!({"do_not_notify": "true"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
                .up_to_n_times(3)
                .with_priority(1)
                .expect(3)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .and(body_partial_json(serde_json::json!({"do_not_notify": "true"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(data_body()))
                .with_priority(2)
                .expect(1)
                .mount(&server)
                .await;

            let ch = MfaChallenge::new(&c, server_state(&server, ONELOGIN_PROTECT), 123);
            let outcome = ch
                .push_and_poll(7, 10, std::time::Duration::ZERO)
                .await
                .unwrap();
            let MfaOutcome::Resolved(a) = outcome else {
                panic!("expected approval, got {outcome:?}");
            };
            assert_eq!(a.roles().unwrap().len(), 1);
        }

        #[tokio::test]
        async fn times_out() {
            let server = MockServer::start().await;
            let dir = tempfile::tempdir().unwrap();
            let c = client_for(&server, &dir).await;
            mount_push(&server).await;
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .and(body_partial_json(serde_json::json!({"do_not_notify": "true"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
                .expect(4)
                .mount(&server)
                .await;

            let ch = MfaChallenge::new(&c, server_state(&server, ONELOGIN_PROTECT), 123);
            assert!(matches!(
                ch.push_and_poll(7, 4, std::time::Duration::ZERO)
                    .await
                    .unwrap(),
                MfaOutcome::TimedOut
            ));
        }

        #[tokio::test]
        async fn poll_failure_propagates() {
            let server = MockServer::start().await;
            let dir = tempfile::tempdir().unwrap();
            let c = client_for(&server, &dir).await;
            mount_push(&server).await;
            Mock::given(method("POST"))
                .and(path(VERIFY_PATH))
                .and(body_partial_json(serde_json::json!({"do_not_notify": "true"})))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let ch = MfaChallenge::new(&c, server_state(&server, ONELOGIN_PROTECT), 123);
            assert!(ch
                .push_and_poll(7, 4, std::time::Duration::ZERO)
                .await
                .is_err());
        }
    }
}
