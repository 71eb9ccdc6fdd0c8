//! HTTP transport for the catalog action API.
//!
//! Every catalog call goes through [`CkanClient`]. `get` and `post` retry
//! network failures and non-200 responses according to the client's
//! [`RetryConfig`] and never return an error: once retries are exhausted
//! the failure is folded into an [`ActionResponse`] with `success: false`.
//! Callers inspect `success` and must not expect anything to propagate.

use futures::StreamExt;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::retry::{with_retry, RetryConfig};
use crate::sanitize::truncate_chars;

/// Path of the versioned action namespace below the base URL.
pub const API_PREFIX: &str = "api/3/action";

/// How much of a non-JSON error body ends up in the failure message.
const ERROR_SNIPPET_LEN: usize = 100;

/// Which catalog a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Catalog being migrated from.
    Source,
    /// Catalog being migrated to.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("Source"),
            Self::Target => f.write_str("Target"),
        }
    }
}

/// Envelope returned by every action call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Whether the action succeeded.
    #[serde(default)]
    pub success: bool,
    /// Action result (shape depends on the action).
    #[serde(default)]
    pub result: Value,
    /// Error description when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ActionResponse {
    /// Builds the uniform failure shape.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(Value::String(message.into())),
        }
    }

    /// Human-readable error, for logs.
    #[must_use]
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        }
    }

    /// Converts to the action result, or an [`Error::Api`] on failure.
    pub fn into_result(self) -> Result<Value> {
        if self.success {
            Ok(self.result)
        } else {
            Err(Error::Api(self.error_message()))
        }
    }
}

/// Status and body of a single, unretried call.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl RawResponse {
    /// Parses the body as an action envelope, if it is one.
    #[must_use]
    pub fn action(&self) -> Option<ActionResponse> {
        serde_json::from_str(&self.body).ok()
    }

    /// True for a 200 response whose envelope reports success.
    #[must_use]
    pub fn is_action_success(&self) -> bool {
        self.status == StatusCode::OK.as_u16() && self.action().is_some_and(|a| a.success)
    }
}

/// Builds the failure message for a non-200 response.
///
/// Uses the envelope's `error` field when the body is JSON, otherwise the
/// first characters of the raw body.
#[must_use]
pub fn describe_http_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => match json.get("error") {
            Some(Value::String(s)) => format!("HTTP {status}: {s}"),
            Some(other) => format!("HTTP {status}: {other}"),
            None => format!("HTTP {status}"),
        },
        Err(_) => format!("HTTP {status}: {}", truncate_chars(body, ERROR_SNIPPET_LEN)),
    }
}

/// Authenticated client for one catalog instance.
#[derive(Debug, Clone)]
pub struct CkanClient {
    side: Side,
    base_url: String,
    api_key: String,
    http: Client,
    retry: RetryConfig,
}

impl CkanClient {
    /// Creates a client with configured timeout and retry policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        side: Side,
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            side,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
            retry,
        })
    }

    /// Which catalog this client talks to.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Full URL for an action.
    #[must_use]
    pub fn action_url(&self, action: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, action)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.header("Authorization", &self.api_key)
        }
    }

    /// Calls an action with GET and query parameters.
    pub async fn get(&self, action: &str, params: &[(&str, &str)]) -> ActionResponse {
        let url = self.action_url(action);
        let name = format!("{} {}", self.side, action);
        let result = with_retry(&self.retry, &name, || {
            self.send_action(self.authorized(self.http.get(&url).query(params)))
        })
        .await;
        self.settle(action, result)
    }

    /// Calls an action with POST and a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, action: &str, body: &B) -> ActionResponse {
        let url = self.action_url(action);
        let name = format!("{} {}", self.side, action);
        let result = with_retry(&self.retry, &name, || {
            self.send_action(self.authorized(self.http.post(&url).json(body)))
        })
        .await;
        self.settle(action, result)
    }

    fn settle(&self, action: &str, result: Result<ActionResponse>) -> ActionResponse {
        match result {
            Ok(response) => response,
            Err(e) => {
                error!("{} API error on {}: {}", self.side, action, e);
                ActionResponse::failure(e.to_string())
            }
        }
    }

    /// One attempt: 200 parses the envelope, anything else is an error.
    async fn send_action(&self, request: RequestBuilder) -> Result<ActionResponse> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(Error::Status {
                status: status.as_u16(),
                message: describe_http_failure(status.as_u16(), &body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Streams a file into `dest` with this client's credential, retrying
    /// on failure. Every attempt rewrites `dest` from the start, so the
    /// body is never held in memory as a whole.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let name = format!("{} download", self.side);
        with_retry(&self.retry, &name, || async {
            let response = self
                .authorized(self.http.get(url))
                .send()
                .await?
                .error_for_status()?;

            let mut file = File::create(dest).await?;
            let mut stream = response.bytes_stream();
            let mut written: u64 = 0;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;

            debug!("Downloaded {} bytes from {}", written, url);
            Ok::<_, Error>(written)
        })
        .await
    }

    /// Posts a JSON body once, without retries.
    ///
    /// # Errors
    ///
    /// Returns an error only on network failure.
    pub async fn post_once<B: Serialize + ?Sized>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<RawResponse> {
        let request = self.authorized(self.http.post(self.action_url(action)).json(body));
        Self::send_raw(request).await
    }

    /// Posts a multipart form once, without retries.
    ///
    /// # Errors
    ///
    /// Returns an error only on network failure.
    pub async fn post_multipart(&self, action: &str, form: Form) -> Result<RawResponse> {
        let request = self.authorized(self.http.post(self.action_url(action)).multipart(form));
        Self::send_raw(request).await
    }

    async fn send_raw(request: RequestBuilder) -> Result<RawResponse> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
