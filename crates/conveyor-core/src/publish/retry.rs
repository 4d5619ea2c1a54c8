//! Bounded retry with backoff for transient network failures.
//!
//! Connect/timeout errors, 429 and 5xx responses are retried up to the
//! configured attempt count; 4xx-class responses are authentication or
//! validation errors and are surfaced immediately without retrying.
use std::time::Duration;

use crate::publish::PublishError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, backoff: Duration::from_secs(2) }
    }
}

impl RetryPolicy {
    /// Send a request, retrying transient failures. `build` is invoked once
    /// per attempt since a request body (e.g. a multipart form) cannot be
    /// reused after sending.
    pub async fn send<F>(&self, target: &str, mut build: F) -> Result<reqwest::Response, PublishError>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;
        for attempt in 1..=self.attempts.max(1) {
            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let transient = status.as_u16() == 429 || status.is_server_error();
                    let body = response.text().await.unwrap_or_default();
                    let error = PublishError::Rejected {
                        target: target.to_string(),
                        status: status.as_u16(),
                        body,
                    };
                    if !transient {
                        return Err(error);
                    }
                    log::warn!("{} returned {} (attempt {}/{})", target, status, attempt, self.attempts);
                    last_error = Some(error);
                }
                Err(source) => {
                    let transient = source.is_connect() || source.is_timeout();
                    let error = PublishError::Http { target: target.to_string(), source };
                    if !transient {
                        return Err(error);
                    }
                    log::warn!("{} request failed (attempt {}/{}): {}", target, attempt, self.attempts, error);
                    last_error = Some(error);
                }
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }
        Err(last_error.unwrap_or_else(|| PublishError::UnexpectedResponse {
            target: target.to_string(),
            reason: "retry budget exhausted without a recorded error".to_string(),
        }))
    }
}
