use std::time::Duration;

use backoff::backoff::Backoff;
use serde_json::Value;
use tracing::{Span, debug, info, warn};
use ureq::Agent;

use crate::config::RetryPolicy;
use crate::constants::http::{MAX_BODY_BYTES, REQUEST_TIMEOUT_SECS, RESPONSE_BODY_TIMEOUT_SECS};
use crate::errors::IngestError;

/// GET-and-parse seam used by every ingestor.
///
/// `endpoint` is appended to the implementation's base URL.
pub trait JsonFetch {
    /// Issue one logical GET and return the parsed JSON body.
    fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, IngestError>;
}

/// Blocking HTTP client bound to one base URL, with bounded exponential backoff.
pub struct FetchClient {
    base_url: String,
    agent: Agent,
    retry: RetryPolicy,
    span: Span,
}

impl FetchClient {
    /// Client for `base_url` with the default timeouts and retry policy.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            agent: build_agent(
                Duration::from_secs(REQUEST_TIMEOUT_SECS),
                Duration::from_secs(RESPONSE_BODY_TIMEOUT_SECS),
            ),
            retry: RetryPolicy::default(),
            span: Span::none(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Attach the span log events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Base URL requests are built from.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn attempt(&self, url: &str, params: &[(&str, String)]) -> Result<Value, IngestError> {
        let mut request = self.agent.get(url);
        for (key, value) in params {
            request = request.query(*key, value);
        }
        let mut response = request.call().map_err(|err| match err {
            ureq::Error::StatusCode(status) => IngestError::HttpStatus {
                url: url.to_string(),
                status,
            },
            other => IngestError::Http {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })?;

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(|err| IngestError::Http {
                url: url.to_string(),
                reason: format!("failed reading response body: {err}"),
            })?;

        serde_json::from_str(&body).map_err(|err| IngestError::InvalidJson {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

impl JsonFetch for FetchClient {
    fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, IngestError> {
        let url = self.url_for(endpoint);
        let schedule = AttemptBackoff::new(self.retry);
        let max_attempts = schedule.max_attempts();
        let mut attempt = 0u32;

        let op = || {
            attempt += 1;
            info!(parent: &self.span, "GET {url}");
            self.attempt(&url, params).map_err(classify)
        };
        let notify = |err: IngestError, wait: Duration| {
            warn!(
                parent: &self.span,
                "attempt failed: {err}; retrying in {:.1}s (budget {max_attempts} attempts)",
                wait.as_secs_f64()
            );
        };

        let result = backoff::retry_notify(schedule, op, notify);
        result.map_err(|err| {
            debug!(parent: &self.span, "giving up on {url} after {attempt} attempt(s)");
            match err {
                backoff::Error::Permanent(err) => err,
                backoff::Error::Transient { err, .. } => err,
            }
        })
    }
}

fn classify(err: IngestError) -> backoff::Error<IngestError> {
    if err.is_transient() {
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}

/// Agent whose timeouts apply per phase: connecting, sending, and waiting for
/// the response head each get `phase`, reading the body gets `body`.
pub(crate) fn build_agent(phase: Duration, body: Duration) -> Agent {
    Agent::config_builder()
        .timeout_connect(Some(phase))
        .timeout_send_request(Some(phase))
        .timeout_recv_response(Some(phase))
        .timeout_recv_body(Some(body))
        .build()
        .into()
}

/// [`RetryPolicy`] as a `backoff` schedule: one wait per failed attempt, then
/// `None` once the attempt budget is spent.
#[derive(Clone, Debug)]
pub struct AttemptBackoff {
    policy: RetryPolicy,
    failed: u32,
}

impl AttemptBackoff {
    /// Schedule starting before the first attempt.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, failed: 0 }
    }

    /// Total attempts allowed, never less than one.
    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }
}

impl Backoff for AttemptBackoff {
    fn reset(&mut self) {
        self.failed = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.failed += 1;
        if self.failed >= self.max_attempts() {
            return None;
        }
        Some(self.policy.wait_after(self.failed))
    }
}
