// Analysis and auth clients for the remote service
//
// The analyze call is a single atomic request/response exchange: one
// multipart POST, optional bearer header, no backoff, no caching, no
// streaming. The `Analyzer` trait is the seam that lets the workflow tests
// drive the state machine with a scripted fake instead of a live server.

mod error;

pub use error::{AnalysisError, AuthError};

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::capture::{CapturedImage, ImageId};

/// Immutable value built at submission time from the active image and the
/// session's credential (if any).
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    image: Arc<CapturedImage>,
    credential: Option<String>,
}

impl AnalysisRequest {
    pub fn new(image: Arc<CapturedImage>, credential: Option<String>) -> Self {
        Self { image, credential }
    }

    /// Identity of the image this request was built from. Completions are
    /// matched against the active image through this tag.
    pub fn image_id(&self) -> ImageId {
        self.image.id
    }
}

/// The service's findings: markdown text, immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    text: String,
}

impl AnalysisReport {
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl From<String> for AnalysisReport {
    fn from(text: String) -> Self {
        Self { text }
    }
}

/// Seam between the workflow and the transport. At most one call is
/// outstanding per session; the orchestrator enforces that, not the client.
pub trait Analyzer: Send + Sync + 'static {
    fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> BoxFuture<'static, Result<AnalysisReport, AnalysisError>>;
}

/// HTTP implementation of [`Analyzer`] against `POST {api_url}/analyze`.
pub struct HttpAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Analyzer for HttpAnalyzer {
    fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> BoxFuture<'static, Result<AnalysisReport, AnalysisError>> {
        let client = self.client.clone();
        let url = format!("{}/analyze", self.base_url);

        async move {
            let part = reqwest::multipart::Part::bytes(request.image.bytes.clone())
                .file_name(request.image.preview.display_name.clone())
                .mime_str(request.image.content_type)
                .map_err(|e| AnalysisError::Transport(format!("invalid content type: {e}")))?;
            let form = reqwest::multipart::Form::new().part("file", part);

            let mut req = client.post(&url).multipart(form);
            if let Some(token) = &request.credential {
                req = req.bearer_auth(token);
            }

            tracing::debug!(image = %request.image_id(), %url, "submitting analysis request");
            let response = req
                .send()
                .await
                .map_err(|e| AnalysisError::Transport(e.to_string()))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| AnalysisError::Transport(e.to_string()))?;

            interpret_analyze_response(status, &body)
        }
        .boxed()
    }
}

/// Map an analyze response onto the failure taxonomy. Pure so the status
/// and body handling is testable without a live server.
fn interpret_analyze_response(
    status: StatusCode,
    body: &[u8],
) -> Result<AnalysisReport, AnalysisError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AnalysisError::Unauthorized);
    }
    if !status.is_success() {
        return Err(AnalysisError::Server {
            status: status.as_u16(),
        });
    }

    let parsed: AnalyzeResponse =
        serde_json::from_slice(body).map_err(|_| AnalysisError::MalformedResponse)?;
    match parsed.message {
        Some(message) => Ok(AnalysisReport::from(message)),
        None => Err(AnalysisError::MalformedResponse),
    }
}

/// Success body of the analyze endpoint: `{"message": "<markdown>"}`
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    message: Option<String>,
}

/// Error body shared by the login and signup endpoints: `{"detail": "..."}`
#[derive(Debug, Deserialize)]
struct RejectionBody {
    detail: Option<String>,
}

/// Success body of the login endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the token-issuing collaborator (`/login`, `/signup`).
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange username/password for a bearer token.
    /// The endpoint expects an OAuth2 password form, so the body is
    /// form-url-encoded rather than JSON.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        interpret_token_response(status, &body)
    }

    /// Create an account. The service answers the created user on success
    /// and a `detail` message on failure (e.g. duplicate email).
    pub async fn signup(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let url = format!("{}/signup", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Err(rejection(status, &body))
    }
}

fn interpret_token_response(status: StatusCode, body: &[u8]) -> Result<String, AuthError> {
    if !status.is_success() {
        return Err(rejection(status, body));
    }
    let parsed: TokenResponse =
        serde_json::from_slice(body).map_err(|_| AuthError::MalformedResponse)?;
    Ok(parsed.access_token)
}

/// Prefer the service's own `detail` message; fall back to the status code.
fn rejection(status: StatusCode, body: &[u8]) -> AuthError {
    let detail = serde_json::from_slice::<RejectionBody>(body)
        .ok()
        .and_then(|b| b.detail);
    match detail {
        Some(detail) => AuthError::Rejected(detail),
        None => AuthError::Rejected(format!("request failed (HTTP {})", status.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_success_passes_report_through_unmodified() {
        let report = interpret_analyze_response(
            StatusCode::OK,
            br###"{"message": "## Safe to eat\n\nNo flagged ingredients."}"###,
        )
        .expect("2xx with message should resolve");
        assert_eq!(report.text(), "## Safe to eat\n\nNo flagged ingredients.");
    }

    #[test]
    fn analyze_unauthorized_maps_401_and_403() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = interpret_analyze_response(status, b"{}").unwrap_err();
            assert_eq!(err, AnalysisError::Unauthorized);
        }
    }

    #[test]
    fn analyze_other_non_success_is_server_error() {
        let err = interpret_analyze_response(StatusCode::INTERNAL_SERVER_ERROR, b"oops")
            .unwrap_err();
        assert_eq!(err, AnalysisError::Server { status: 500 });
    }

    #[test]
    fn analyze_missing_message_field_is_malformed() {
        let err = interpret_analyze_response(StatusCode::OK, br#"{"status": "done"}"#)
            .unwrap_err();
        assert_eq!(err, AnalysisError::MalformedResponse);

        let err = interpret_analyze_response(StatusCode::OK, b"not json at all").unwrap_err();
        assert_eq!(err, AnalysisError::MalformedResponse);
    }

    #[test]
    fn login_success_extracts_access_token() {
        let token = interpret_token_response(
            StatusCode::OK,
            br#"{"access_token": "abc123", "token_type": "bearer"}"#,
        )
        .expect("2xx with access_token should resolve");
        assert_eq!(token, "abc123");
    }

    #[test]
    fn login_failure_carries_detail_message() {
        let err = interpret_token_response(
            StatusCode::BAD_REQUEST,
            br#"{"detail": "Incorrect email or password"}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AuthError::Rejected("Incorrect email or password".to_string())
        );
    }

    #[test]
    fn login_failure_without_detail_falls_back_to_status() {
        let err = interpret_token_response(StatusCode::BAD_GATEWAY, b"").unwrap_err();
        assert_eq!(
            err,
            AuthError::Rejected("request failed (HTTP 502)".to_string())
        );
    }
}
