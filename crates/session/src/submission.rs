//! Sending a validated record to the onboarding endpoint.

use std::time::Duration;

use async_trait::async_trait;
use onboard_core::{FormRecord, SubmissionBlocked};

/// Default endpoint the form posts to.
pub const DEFAULT_ONBOARD_URL: &str = "http://localhost:3000/api/onboard";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Blocked(#[from] SubmissionBlocked),

    #[error("Submission request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },
}

/// One outbound submission. Implementations do not retry.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, record: &FormRecord) -> Result<(), SubmitError>;
}

#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ONBOARD_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SubmissionConfig {
    /// Read `ONBOARD_URL` and `SUBMIT_TIMEOUT_SECS`, falling back to the
    /// defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("ONBOARD_URL").unwrap_or(defaults.endpoint),
            timeout: std::env::var("SUBMIT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// POSTs the record as JSON. Any 2xx response is success.
pub struct HttpSubmission {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSubmission {
    pub fn new(config: &SubmissionConfig) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubmissionGateway for HttpSubmission {
    async fn submit(&self, record: &FormRecord) -> Result<(), SubmitError> {
        let response = self.client.post(&self.endpoint).json(record).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }
        tracing::info!(endpoint = %self.endpoint, status = status.as_u16(), "Form submitted");
        Ok(())
    }
}
