/// Faults reported by AWS STS during the federation exchange
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String, #[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String, #[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Permission denied: {0}")]
    PermissionDenied(String, #[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String, #[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Unknown: {0} ({1})")]
    Unknown(String, #[source] Box<dyn std::error::Error + Send + Sync>),
}

pub(crate) fn http() -> reqwest::Client {
    static HTTP: once_cell::sync::OnceCell<reqwest::Client> = once_cell::sync::OnceCell::new();
    HTTP.get_or_init(|| {
        reqwest::ClientBuilder::new()
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default()
    })
    .clone()
}

/// Turns a non-2xx response into [crate::Error::ProviderError], keeping the body for the user.
pub(crate) async fn check_provider_response(
    url: &url::Url,
    resp: reqwest::Response,
) -> crate::Result<reqwest::Response> {
    if let Err(e) = resp.error_for_status_ref() {
        let status_code = e.status().unwrap_or(resp.status());
        let message = resp.text().await.unwrap_or_default();
        tracing::debug!(url = %url, err0 = ?e, status_code = ?status_code, "response was not ok");
        return Err(crate::Error::ProviderError {
            url: url.clone(),
            status_code,
            message,
        });
    }
    Ok(resp)
}
