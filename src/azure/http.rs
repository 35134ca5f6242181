//! HTTP utilities for ARM REST API calls

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::error::{Error, Result};

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const USER_AGENT: &str = concat!("azrm/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    /// Parse the body as JSON; an empty body becomes `Value::Null`
    pub fn json(&self) -> std::result::Result<Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
    }

    /// Extract `error.code` and `error.message` from an ARM error body
    pub fn api_error(&self) -> (Option<String>, String) {
        let parsed: Option<Value> = serde_json::from_str(&self.body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let code = error
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_str())
            .map(|c| c.to_string());
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        (code, message)
    }
}

/// HTTP client wrapper for ARM calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("creating HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// The underlying reqwest client, shared with token exchanges
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Send one request; non-success statuses are returned, not turned into errors
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> std::result::Result<RawResponse, reqwest::Error> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        }

        Ok(RawResponse { status, body })
    }
}

/// Format an error for display on the command line
pub fn format_arm_error(error: &Error) -> String {
    match error {
        Error::Api { status: 401, .. } => {
            "Authentication failed. Check the configured credentials.".to_string()
        },
        Error::Api { status: 403, .. } => {
            "Permission denied. Check the role assignments of the principal.".to_string()
        },
        Error::Api { status: 404, id, .. } => format!("Resource not found: {}", id),
        Error::Api { status: 409, message, .. } => format!("Resource conflict: {}", message),
        Error::Api { status: 429, .. } => "Rate limit exceeded. Please try again later.".to_string(),
        Error::Api { status, .. } if *status >= 500 => {
            "Azure service temporarily unavailable. Please try again.".to_string()
        },
        Error::Api { code: Some(code), message, .. } => format!("{}: {}", code, message),
        other => other.to_string(),
    }
}
