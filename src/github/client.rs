// GitHub API HTTP client.
// Handles optional authentication, rate limit tracking, and upstream status normalization.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::debug;

use crate::error::{PulseError, Result};

use super::types::RateLimit;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = "devpulse";

/// GitHub API client with optional token auth and rate limit tracking.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    rate_limit: Mutex<RateLimit>,
}

impl GitHubClient {
    /// Create a client against `base_url`. Without a token requests go out
    /// unauthenticated and get GitHub's lower rate limit.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("token {}", token))
                    .map_err(|e| PulseError::Validation(format!("Invalid token: {}", e)))?,
            );
        }
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| PulseError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            rate_limit: Mutex::new(RateLimit::default()),
        })
    }

    /// Get the most recently observed rate limit information.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// GET `endpoint` and decode the body as JSON.
    pub async fn get_json(&self, endpoint: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "requesting upstream");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.update_rate_limit(&response);

        let response = self.check_response(response).await?;
        let value = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(value)
    }

    fn transport_error(&self, err: reqwest::Error) -> PulseError {
        if err.is_timeout() {
            PulseError::Timeout(self.timeout)
        } else {
            err.into()
        }
    }

    /// Update rate limit from response headers.
    fn update_rate_limit(&self, response: &Response) {
        let header = |name: &str| -> Option<u64> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        let mut rate_limit = self.rate_limit.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(limit) = header("x-ratelimit-limit") {
            rate_limit.limit = limit;
        }
        if let Some(remaining) = header("x-ratelimit-remaining") {
            rate_limit.remaining = remaining;
        }
        if let Some(reset) = header("x-ratelimit-reset") {
            rate_limit.reset = reset;
        }
    }

    /// Check response status and convert errors.
    async fn check_response(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::FORBIDDEN => {
                let reset = self.rate_limit().reset;
                let reset_at = (reset > 0)
                    .then(|| chrono::DateTime::from_timestamp(reset as i64, 0))
                    .flatten()
                    .map(|dt| dt.format("%H:%M:%S").to_string());
                Err(PulseError::RateLimited { reset_at })
            }
            StatusCode::NOT_FOUND => Err(PulseError::NotFound(
                response.url().path().to_string(),
            )),
            StatusCode::UNAUTHORIZED => Err(PulseError::AuthFailed),
            StatusCode::UNPROCESSABLE_ENTITY => Err(PulseError::UpstreamValidation),
            StatusCode::SERVICE_UNAVAILABLE => Err(PulseError::UpstreamUnavailable),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(PulseError::Upstream {
                    status: status.as_u16(),
                    message: upstream_message(status, &body),
                })
            }
        }
    }
}

/// Message for an unmapped upstream failure: the JSON `message` field if the
/// body parses, otherwise the raw body appended to a generic prefix.
fn upstream_message(status: StatusCode, body: &str) -> String {
    let fallback = format!("GitHub API error: {}", status.as_u16());
    if body.is_empty() {
        return fallback;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or(fallback),
        Err(_) => format!("{} - {}", fallback, body),
    }
}
