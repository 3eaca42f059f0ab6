use super::{ApiRequest, Sleeper, TokioSleeper, Transport};
use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per call, the first one included.
    pub max_attempts: u32,
    /// Wait used when a retryable response carries no numeric `retry-after`.
    pub fallback_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fallback_delay: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// `retry-after` seconds plus one, so a `0` never turns into a busy retry.
    pub fn delay_for(&self, retry_after: Option<&str>) -> Duration {
        match retry_after.and_then(|value| value.trim().parse::<u64>().ok()) {
            Some(secs) => Duration::from_secs(secs.saturating_add(1)),
            None => self.fallback_delay,
        }
    }
}

struct FailedAttempt {
    error: AppError,
    retry_after: Option<String>,
    /// The request may have reached the server without an answer coming back.
    maybe_delivered: bool,
}

impl From<AppError> for FailedAttempt {
    fn from(error: AppError) -> Self {
        Self {
            error,
            retry_after: None,
            maybe_delivered: false,
        }
    }
}

/// Methods whose replay cannot create a second remote entity.
fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    headers: HeaderMap,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpTransport {
    pub fn new(
        base_url: Url,
        headers: HeaderMap,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            headers,
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| AppError::Protocol(format!("Invalid path '{}': {}", request.path, e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    async fn attempt(
        &self,
        request: &ApiRequest,
        url: &Url,
        body_text: Option<&str>,
    ) -> std::result::Result<Value, FailedAttempt> {
        let headers = request
            .headers
            .clone()
            .unwrap_or_else(|| self.headers.clone());
        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = body_text {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method = %request.method, url = %url, error = %e, "Request did not complete");
            if e.is_builder() {
                FailedAttempt::from(AppError::Protocol(format!("Failed to build request: {}", e)))
            } else {
                FailedAttempt {
                    error: AppError::TransientNetwork(format!("Request failed: {}", e)),
                    retry_after: None,
                    maybe_delivered: !e.is_connect(),
                }
            }
        })?;

        let status = response.status();
        info!(method = %request.method, url = %url, status = status.as_u16(), "Request");

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let text = match response.text().await {
            Ok(text) => text,
            // The server already applied the request; replaying it would repeat the write.
            Err(e) if status.is_success() => {
                error!(
                    method = %request.method,
                    url = %url,
                    status = status.as_u16(),
                    error = %e,
                    "Response body lost after success"
                );
                return Err(FailedAttempt::from(AppError::Protocol(format!(
                    "Failed to read {} response body: {}",
                    status, e
                ))));
            }
            Err(e) => {
                return Err(FailedAttempt::from(AppError::TransientNetwork(format!(
                    "Failed to read response body: {}",
                    e
                ))))
            }
        };

        if status.is_success() {
            return parse_body(&text).map_err(FailedAttempt::from);
        }

        warn!(
            method = %request.method,
            url = %url,
            status = status.as_u16(),
            status_text = status.canonical_reason().unwrap_or(""),
            response = %text,
            request_body = body_text.unwrap_or(""),
            "Request failed"
        );

        Err(FailedAttempt {
            error: classify(status, retry_after.as_deref(), text),
            retry_after,
            maybe_delivered: false,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url(&request)?;
        let body_text = request.body.as_ref().map(|body| body.to_string());
        let max_attempts = self.policy.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let failed = match self.attempt(&request, &url, body_text.as_deref()).await {
                Ok(value) => return Ok(value),
                Err(failed) => failed,
            };

            if !failed.error.is_retryable() {
                return Err(failed.error);
            }
            if failed.maybe_delivered && !is_idempotent(&request.method) {
                warn!(
                    method = %request.method,
                    url = %url,
                    error = %failed.error,
                    "Not retrying, the request may already have been applied"
                );
                return Err(failed.error);
            }

            if attempt >= max_attempts {
                error!(
                    method = %request.method,
                    url = %url,
                    attempts = attempt,
                    error = %failed.error,
                    "Retries exhausted"
                );
                return Err(AppError::RetriesExhausted {
                    method: request.method.to_string(),
                    url: url.to_string(),
                    body: body_text,
                    attempts: attempt,
                    last_error: Box::new(failed.error),
                });
            }

            let delay = self.policy.delay_for(failed.retry_after.as_deref());
            if matches!(failed.error, AppError::Auth(_)) {
                warn!(
                    url = %url,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "Credential rejected, retrying in case the edge token is stale"
                );
            } else {
                warn!(
                    url = %url,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %failed.error,
                    "Transient failure, retrying"
                );
            }
            self.sleeper.sleep(delay).await;
        }
    }
}

fn classify(status: StatusCode, retry_after: Option<&str>, text: String) -> AppError {
    let code = status.as_u16();
    match code {
        429 => AppError::RateLimited {
            retry_after: retry_after.and_then(|value| value.trim().parse().ok()),
            message: text,
        },
        401 => AppError::Auth(text),
        400..=499 => AppError::Client {
            status: code,
            message: text,
        },
        500..=599 => AppError::Server {
            status: code,
            message: text,
        },
        _ => AppError::Protocol(format!("Unexpected status {}: {}", status, text)),
    }
}

fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
        .map_err(|e| AppError::Protocol(format!("Failed to parse JSON: {}", e)))
}

/// Content type plus the given `Authorization` value.
pub fn default_headers(authorization: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    let mut auth = HeaderValue::from_str(authorization)
        .map_err(|_| AppError::Config("Credential contains invalid header characters".to_string()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    Ok(headers)
}
