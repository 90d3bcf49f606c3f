// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared HTTP machinery for providers
//!
//! [`HttpFetcher`] renders an endpoint template, waits for the provider's rate
//! limiter, sends the request under a timeout and classifies the response
//! through the error taxonomy. Gateway and timeout failures are retried
//! exactly once; everything else is surfaced immediately.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use api_client::{
    EndpointTemplate, ErrorPatterns, ProviderError, RenderedEndpoint, classify, failure_message,
};
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::time::timeout;
use tokio_retry::{RetryIf, strategy::FixedInterval};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    credentials::{Credentials, KeyPlacement},
    rate_limit::RateLimiter,
};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause before the single transient retry
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Connection settings of one provider instance
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Base URL the endpoint paths are appended to
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Minimum interval between two outbound calls
    pub rate_limit: Duration,
    /// Pause before the transient retry
    pub retry_delay: Duration,
    /// API key, if the provider needs one
    pub credentials: Option<Credentials>,
    /// Provider-specific error vocabulary
    pub patterns: ErrorPatterns,
}

impl FetcherConfig {
    /// Settings with default timeouts, no rate limit and the standard error vocabulary
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            rate_limit: Duration::ZERO,
            retry_delay: DEFAULT_RETRY_DELAY,
            credentials: None,
            patterns: ErrorPatterns::standard(),
        }
    }
}

/// A successful, parsed response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body; `Null` for an empty body
    pub body: Value,
}

/// Rate-limited, retrying JSON client bound to one provider instance
#[derive(Debug)]
pub struct HttpFetcher {
    name: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    retry_delay: Duration,
    limiter: RateLimiter,
    credentials: Option<Credentials>,
    patterns: ErrorPatterns,
}

impl HttpFetcher {
    /// Create a fetcher for the provider called `name`
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` if the base URL is not a valid
    /// absolute URL or the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, config: FetcherConfig) -> Result<Self, ProviderError> {
        let name = name.into();
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            ProviderError::config(format!("invalid base URL for {name}: {e}"))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("chain-aggregator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name,
            client,
            base_url,
            timeout: config.timeout,
            retry_delay: config.retry_delay,
            limiter: RateLimiter::new(config.rate_limit),
            credentials: config.credentials,
            patterns: config.patterns,
        })
    }

    /// Provider name used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Error vocabulary used for classification
    pub fn patterns(&self) -> &ErrorPatterns {
        &self.patterns
    }

    /// Renders `template` and performs a GET request
    ///
    /// Template rendering happens first, so a missing required parameter
    /// fails before the rate limiter or the network is touched.
    ///
    /// # Errors
    ///
    /// Returns caller errors from rendering, classified provider errors, or
    /// transport errors once the single retry is spent.
    pub async fn get(
        &self,
        endpoint: &str,
        template: &EndpointTemplate,
        params: &BTreeMap<String, String>,
    ) -> Result<HttpResponse, ProviderError> {
        let rendered = template.render(endpoint, params)?;
        let url = self.endpoint_url(&rendered)?;

        let request_id = Uuid::new_v4();
        let attempts = AtomicU32::new(0);

        RetryIf::spawn(
            FixedInterval::new(self.retry_delay).take(1),
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let url = url.clone();
                let path = rendered.path.as_str();
                async move {
                    if attempt > 1 {
                        warn!(
                            provider = %self.name,
                            request_id = %request_id,
                            endpoint,
                            path,
                            attempt,
                            "retrying after transient provider error"
                        );
                    }
                    self.attempt(url, request_id, endpoint, path).await
                }
            },
            ProviderError::is_retryable,
        )
        .await
    }

    /// Joins the base URL, the rendered path and the query pairs
    fn endpoint_url(&self, rendered: &RenderedEndpoint) -> Result<Url, ProviderError> {
        let path = if rendered.path.starts_with('/') || rendered.path.is_empty() {
            rendered.path.clone()
        } else {
            format!("/{}", rendered.path)
        };
        let mut url = Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| ProviderError::config(format!("invalid endpoint URL: {e}")))?;
        if !rendered.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&rendered.query);
        }
        Ok(url)
    }

    async fn attempt(
        &self,
        url: Url,
        request_id: Uuid,
        endpoint: &str,
        path: &str,
    ) -> Result<HttpResponse, ProviderError> {
        self.limiter.acquire().await;

        debug!(
            provider = %self.name,
            request_id = %request_id,
            endpoint,
            path,
            "sending provider request"
        );

        let mut request = self
            .client
            .get(url)
            .header("accept", "application/json");
        if let Some(credentials) = &self.credentials {
            request = match &credentials.placement {
                KeyPlacement::Header { name } => {
                    request.header(name.as_str(), credentials.key.expose())
                }
                KeyPlacement::Query { name } => {
                    request.query(&[(name.as_str(), credentials.key.expose())])
                }
            };
        }

        let response = timeout(self.timeout, request.send())
            .await
            .map_err(|_| ProviderError::Timeout {
                timeout_seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        debug!(
            provider = %self.name,
            request_id = %request_id,
            status = status.as_u16(),
            bytes = body.len(),
            "received provider response"
        );

        if let Some(class) = classify(status.as_u16(), &body, &self.patterns) {
            let reason = status.canonical_reason().unwrap_or("unknown status");
            let message = failure_message(status.as_u16(), &body, &self.patterns, reason);
            warn!(
                provider = %self.name,
                request_id = %request_id,
                status = status.as_u16(),
                class = ?class,
                message,
                "provider request failed"
            );
            return Err(ProviderError::from_class(class, status.as_u16(), message));
        }

        let body = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("{} returned invalid JSON: {e}", self.name))
            })?
        };

        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// Maps a transport failure, stripping the URL so query credentials never leak
    fn transport_error(&self, error: reqwest::Error) -> ProviderError {
        let error = error.without_url();
        if error.is_timeout() {
            ProviderError::Timeout {
                timeout_seconds: self.timeout.as_secs(),
            }
        } else if error.is_connect() {
            ProviderError::Gateway {
                status: None,
                message: error.to_string(),
            }
        } else {
            ProviderError::Http {
                message: error.to_string(),
            }
        }
    }
}
