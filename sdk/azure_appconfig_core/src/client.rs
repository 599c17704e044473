//! HTTP client for Azure App Configuration.
//!
//! This module provides [`ConfigClient`], the transport every service
//! operation is built on. The client handles endpoint management, request
//! signing, sync-token propagation, and automatic retry on transient errors.
//!
//! # Examples
//!
//! ## Using a connection string
//! ```rust,no_run
//! use azure_appconfig_core::client::ConfigClient;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ConfigClient::from_connection_string(
//!     "Endpoint=https://my-store.azconfig.io;Id=abc;Secret=c2VjcmV0",
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using a bearer token
//! ```rust,no_run
//! use azure_appconfig_core::client::ConfigClient;
//! use azure_appconfig_core::auth::AppConfigCredential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ConfigClient::builder()
//!     .endpoint("https://my-store.azconfig.io")
//!     .credential(AppConfigCredential::bearer("aad-access-token"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::auth::{parse_connection_string, AppConfigCredential};
use crate::error::{AppConfigError, AppConfigResult};
use crate::sync_token::SyncTokenStore;
use reqwest::{Client as HttpClient, Method};
use url::Url;

use std::time::Duration;

/// Default service API version.
pub const DEFAULT_API_VERSION: &str = "2023-10-01";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Content type for key-value request bodies.
const KV_CONTENT_TYPE: &str = "application/vnd.microsoft.appconfig.kv+json";

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 429 Too Many Requests (rate limiting)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// The base client for an Azure App Configuration store.
///
/// The client is cheaply cloneable and can be shared across threads. Clones
/// share the sync-token store, so read-your-writes consistency holds across
/// all of them.
#[derive(Debug, Clone)]
pub struct ConfigClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: AppConfigCredential,
    pub(crate) api_version: String,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) sync_tokens: SyncTokenStore,
}

/// Builder for constructing a [`ConfigClient`].
///
/// Use [`ConfigClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct ConfigClientBuilder {
    endpoint: Option<String>,
    credential: Option<AppConfigCredential>,
    api_version: Option<String>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ConfigClient {
    /// Create a new builder for configuring a `ConfigClient`.
    pub fn builder() -> ConfigClientBuilder {
        ConfigClientBuilder::default()
    }

    /// Create a client from an App Configuration connection string
    /// (`Endpoint=...;Id=...;Secret=...`). The endpoint is taken from the
    /// connection string itself.
    pub fn from_connection_string(connection_string: &str) -> AppConfigResult<Self> {
        let (endpoint, credential) = parse_connection_string(connection_string)?;
        Self::builder()
            .endpoint(endpoint.as_str())
            .credential(credential)
            .build()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the API version being used.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Add a sync token obtained out of band (for example from an Event Grid
    /// notification) so subsequent reads observe the corresponding write.
    pub fn update_sync_token(&self, token: &str) {
        self.sync_tokens.add(token);
    }

    /// Build a full URL for an API path, appending the `api-version` query
    /// parameter when the path does not already carry one. Continuation
    /// links returned by the service come with their own `api-version`.
    pub fn url(&self, path_and_query: &str) -> AppConfigResult<Url> {
        let mut url = self.endpoint.join(path_and_query).map_err(|e| {
            AppConfigError::InvalidEndpoint(format!("failed to construct URL: {e}"))
        })?;
        let has_api_version = url.query_pairs().any(|(name, _)| name == "api-version");
        if !has_api_version {
            url.query_pairs_mut()
                .append_pair("api-version", &self.api_version);
        }
        Ok(url)
    }

    /// Send a GET request with automatic retry on transient errors.
    ///
    /// # Arguments
    ///
    /// * `path_and_query` - API path, optionally with a query string.
    /// * `headers` - extra request headers (`If-Match`, `Accept-Datetime`, ...).
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails, the request fails after all
    /// retries, or the server returns a non-retriable error response.
    pub async fn get(
        &self,
        path_and_query: &str,
        headers: &[(&'static str, String)],
    ) -> AppConfigResult<reqwest::Response> {
        let url = self.url(path_and_query)?;
        self.send(Method::GET, url, None, headers).await
    }

    /// Send a PUT request with a JSON body, with automatic retry.
    pub async fn put_json<T: serde::Serialize>(
        &self,
        path_and_query: &str,
        body: &T,
        headers: &[(&'static str, String)],
    ) -> AppConfigResult<reqwest::Response> {
        let url = self.url(path_and_query)?;
        let body = serde_json::to_vec(body)?;
        self.send(Method::PUT, url, Some(body), headers).await
    }

    /// Send a bodyless PUT request (used for lock operations), with
    /// automatic retry.
    pub async fn put(
        &self,
        path_and_query: &str,
        headers: &[(&'static str, String)],
    ) -> AppConfigResult<reqwest::Response> {
        let url = self.url(path_and_query)?;
        self.send(Method::PUT, url, None, headers).await
    }

    /// Send a DELETE request with automatic retry.
    pub async fn delete(
        &self,
        path_and_query: &str,
        headers: &[(&'static str, String)],
    ) -> AppConfigResult<reqwest::Response> {
        let url = self.url(path_and_query)?;
        self.send(Method::DELETE, url, None, headers).await
    }

    /// Request loop shared by all verbs: sign, attach sync tokens and extra
    /// headers, retry transient failures with exponential backoff and jitter,
    /// and classify error responses.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        extra_headers: &[(&'static str, String)],
    ) -> AppConfigResult<reqwest::Response> {
        let body = body.unwrap_or_default();

        for attempt in 0..=self.retry_policy.max_retries {
            // The HMAC signature covers x-ms-date, so every attempt signs fresh.
            let auth_headers = self.credential.sign(method.as_str(), &url, &body)?;

            let mut request = self.http.request(method.clone(), url.clone());
            for (name, value) in &auth_headers {
                request = request.header(*name, value);
            }
            for (name, value) in extra_headers {
                request = request.header(*name, value);
            }
            if let Some(token) = self.sync_tokens.header_value() {
                request = request.header("Sync-Token", token);
            }
            if !body.is_empty() {
                request = request
                    .header("Content-Type", KV_CONTENT_TYPE)
                    .body(body.clone());
            }

            let response = request.send().await?;

            if let Some(value) = response
                .headers()
                .get("Sync-Token")
                .and_then(|v| v.to_str().ok())
            {
                self.sync_tokens.update(value);
            }

            let status = response.status().as_u16();
            if response.status().is_success() {
                return Ok(response);
            }

            if !is_retriable_status(status) || attempt == self.retry_policy.max_retries {
                return Err(Self::classify_response(response).await);
            }

            // Backoff with jitter: base * [0.75, 1.25).
            let base_backoff = self.retry_policy.initial_backoff * 2_u32.pow(attempt);
            let jitter = 0.75 + fastrand::f64() * 0.5;
            let backoff = base_backoff.mul_f64(jitter);
            tracing::warn!(status, attempt, ?backoff, "transient error, retrying");
            tokio::time::sleep(backoff).await;
        }

        unreachable!("retry loop should return before reaching here")
    }

    /// Maximum length for error messages to prevent sensitive data leaks.
    const MAX_ERROR_MESSAGE_LEN: usize = 1000;

    /// Markers whose following value gets redacted from error messages.
    const REDACTION_MARKERS: [&'static str; 3] = ["Bearer ", "Signature=", "Secret="];

    /// Sanitize error messages by removing credential material (bearer
    /// tokens, HMAC signatures, connection string secrets).
    pub(crate) fn sanitize_error_message(msg: &str) -> String {
        let mut result = msg.to_string();

        for marker in Self::REDACTION_MARKERS {
            let mut search_start = 0;
            while search_start < result.len() {
                let Some(relative_pos) = result[search_start..].find(marker) else {
                    break;
                };
                let value_start = search_start + relative_pos + marker.len();
                if result[value_start..].starts_with("[REDACTED]") {
                    search_start = value_start + "[REDACTED]".len();
                    continue;
                }
                let value_end = result[value_start..]
                    .find(|c: char| {
                        c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '&' | ';')
                    })
                    .map(|pos| value_start + pos)
                    .unwrap_or(result.len());
                if value_end > value_start {
                    result.replace_range(value_start..value_end, "[REDACTED]");
                    search_start = value_start + "[REDACTED]".len();
                } else {
                    search_start = value_start;
                }
            }
        }

        result
    }

    /// Truncate a message if it exceeds the maximum length.
    /// Also sanitizes sensitive data before truncating.
    pub(crate) fn truncate_message(msg: &str) -> String {
        let sanitized = Self::sanitize_error_message(msg);

        if sanitized.len() > Self::MAX_ERROR_MESSAGE_LEN {
            // The cut must land on a char boundary; walk back if the limit
            // falls inside a multi-byte character.
            let mut cut = Self::MAX_ERROR_MESSAGE_LEN;
            while !sanitized.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated)", &sanitized[..cut])
        } else {
            sanitized
        }
    }

    /// Classify a non-success response into the error taxonomy.
    ///
    /// Condition-independent statuses are mapped here (304, 401/403, 404);
    /// 409 and 412 depend on the match condition the caller sent and are
    /// refined by the operation layer.
    async fn classify_response(response: reqwest::Response) -> AppConfigError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match status {
            304 => AppConfigError::ResourceNotModified,
            401 | 403 => AppConfigError::Auth(Self::truncate_message(&body)),
            404 => AppConfigError::ResourceNotFound,
            _ => {
                // The service reports errors as RFC 7807 problem details;
                // some ARM-style responses use an `error` envelope instead.
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
                    let (code, message) = match value.get("error") {
                        Some(error) => (
                            error.get("code").and_then(|v| v.as_str()),
                            error.get("message").and_then(|v| v.as_str()),
                        ),
                        None => (
                            value.get("type").and_then(|v| v.as_str()),
                            value
                                .get("detail")
                                .or_else(|| value.get("title"))
                                .and_then(|v| v.as_str()),
                        ),
                    };
                    if let (Some(code), Some(message)) = (code, message) {
                        return AppConfigError::Api {
                            status,
                            code: code.to_string(),
                            message: Self::truncate_message(message),
                        };
                    }
                }
                AppConfigError::http(status, Self::truncate_message(&body))
            }
        }
    }
}

impl ConfigClientBuilder {
    /// Set the App Configuration store endpoint URL, e.g.
    /// `https://<store-name>.azconfig.io`.
    ///
    /// If not set, the builder will check the `AZURE_APPCONFIG_ENDPOINT`
    /// environment variable.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// If not set, the builder will use [`AppConfigCredential::from_env()`].
    pub fn credential(mut self, credential: AppConfigCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the API version.
    ///
    /// Defaults to [`DEFAULT_API_VERSION`] (`2023-10-01`).
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout
    /// configuration via [`connect_timeout`](Self::connect_timeout) or
    /// [`read_timeout`](Self::read_timeout) will be ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout, covering the whole request/response cycle.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Configures automatic retries for retriable HTTP errors
    /// (429, 500, 502, 503, 504) with exponential backoff.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `ConfigClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No endpoint is provided and `AZURE_APPCONFIG_ENDPOINT` is not set
    /// - The endpoint URL is invalid
    /// - Credential creation fails (when using environment-based credentials)
    pub fn build(self) -> AppConfigResult<ConfigClient> {
        let http = self.http_client.unwrap_or_else(|| {
            let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
            let read_timeout = self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT);

            reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .timeout(read_timeout)
                .build()
                .expect("failed to build HTTP client")
        });

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var("AZURE_APPCONFIG_ENDPOINT").ok())
            .ok_or_else(|| {
                AppConfigError::MissingConfig(
                    "endpoint is required. Set it via builder or AZURE_APPCONFIG_ENDPOINT env var."
                        .into(),
                )
            })?;

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| AppConfigError::InvalidEndpoint(format!("invalid endpoint URL: {e}")))?;

        let credential = self
            .credential
            .map(Ok)
            .unwrap_or_else(AppConfigCredential::from_env)?;

        Ok(ConfigClient {
            http,
            endpoint,
            credential,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            retry_policy: self.retry_policy.unwrap_or_default(),
            sync_tokens: SyncTokenStore::new(),
        })
    }
}
