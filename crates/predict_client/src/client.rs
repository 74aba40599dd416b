//! HTTP client for the external prediction endpoint.
//!
//! Every `POST /predict` runs under the configured timeout; timeouts,
//! transport failures, and non-2xx responses all retry after a fixed delay
//! until the attempt budget is spent.

use std::error::Error as StdError;

use common::{Error, PredictionFigures, PredictionRequest, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Keep chained causes so network failures (DNS/TLS/socket) are visible.
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn summarize_response_body(raw: &str) -> String {
    const MAX_CHARS: usize = 800;
    let compact = raw.replace('\n', " ").replace('\r', " ");
    if compact.len() > MAX_CHARS {
        format!("{}…", &compact[..MAX_CHARS])
    } else {
        compact
    }
}

/// Outcome of a single attempt, before the retry budget is applied.
enum AttemptFailure {
    TimedOut,
    Failed {
        status: Option<u16>,
        message: String,
    },
}

impl AttemptFailure {
    fn describe(&self) -> String {
        match self {
            AttemptFailure::TimedOut => "timed out".into(),
            AttemptFailure::Failed {
                status: Some(s),
                message,
            } => format!("status {}: {}", s, message),
            AttemptFailure::Failed {
                status: None,
                message,
            } => message.clone(),
        }
    }
}

/// Async client for the prediction API.
#[derive(Debug, Clone)]
pub struct PredictClient {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl PredictClient {
    pub fn new(base_url: &str, policy: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            policy,
        }
    }

    /// URL helper.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request a prediction for the given appliances and window.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionFigures> {
        self.post_with_retry("/predict", request).await
    }

    /// Cheap endpoint liveness probe (no retry).
    pub async fn health_check(&self) -> Result<()> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(Error::Http(format!("health check returned {}", status)));
        }
        Ok(())
    }

    /// POST `path` under the fixed-delay retry policy.
    ///
    /// Timeouts exhaust to `TimeoutExceeded`; everything else exhausts to
    /// `RequestFailed` carrying the last status and message.
    async fn post_with_retry<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let failure = match self.try_post(path, body).await {
                Ok(value) => {
                    debug!("POST {} succeeded on attempt {}", path, attempt);
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            warn!(
                "POST {} attempt {}/{} failed: {}",
                path,
                attempt,
                self.policy.max_attempts(),
                failure.describe()
            );

            if attempt >= self.policy.max_attempts() {
                return Err(match failure {
                    AttemptFailure::TimedOut => Error::TimeoutExceeded { attempts: attempt },
                    AttemptFailure::Failed { status, message } => {
                        Error::RequestFailed { status, message }
                    }
                });
            }

            sleep(self.policy.delay).await;
        }
    }

    async fn try_post<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, AttemptFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let send = self.client.post(self.url(path)).json(body).send();

        let resp = match timeout(self.policy.timeout, send).await {
            Err(_) => return Err(AttemptFailure::TimedOut),
            Ok(Err(e)) => {
                return Err(AttemptFailure::Failed {
                    status: None,
                    message: format_reqwest_error(&e),
                })
            }
            Ok(Ok(resp)) => resp,
        };

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let raw = resp.text().await.unwrap_or_default();
            return Err(AttemptFailure::Failed {
                status: Some(status),
                message: summarize_response_body(&raw),
            });
        }

        resp.json::<T>().await.map_err(|e| AttemptFailure::Failed {
            status: Some(status),
            message: format!("error decoding response: {}", format_reqwest_error(&e)),
        })
    }
}
