//! Blocking HTTP GET with retry and exponential backoff, shared by the
//! remote price sources.

use crate::domain::error::EthSignalError;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

pub fn build_client(source_name: &str) -> Result<Client, EthSignalError> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("ethsignal/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| EthSignalError::data_source(source_name, format!("HTTP client: {e}")))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send the request built by `make_request`, retrying transient failures,
/// and decode the JSON body.
pub fn get_json<T, F>(
    source_name: &str,
    policy: &RetryPolicy,
    make_request: F,
) -> Result<T, EthSignalError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            tracing::warn!(
                source = source_name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );
            std::thread::sleep(delay);
        }

        match make_request().send() {
            Ok(resp) => {
                let status = resp.status();
                if is_retryable(status) {
                    last_error = Some(EthSignalError::data_source(
                        source_name,
                        format!("HTTP {status}"),
                    ));
                    continue;
                }
                if !status.is_success() {
                    let body = resp.text().unwrap_or_default();
                    return Err(EthSignalError::data_source(
                        source_name,
                        format!("HTTP {status}: {}", body.trim()),
                    ));
                }
                return resp.json::<T>().map_err(|e| {
                    EthSignalError::data_source(source_name, format!("invalid response: {e}"))
                });
            }
            Err(e) if e.is_connect() || e.is_timeout() => {
                last_error = Some(EthSignalError::data_source(source_name, e.to_string()));
            }
            Err(e) => return Err(EthSignalError::data_source(source_name, e.to_string())),
        }
    }

    Err(last_error
        .unwrap_or_else(|| EthSignalError::data_source(source_name, "max retries exceeded")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }
}
