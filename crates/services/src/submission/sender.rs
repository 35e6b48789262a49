use async_trait::async_trait;
use reqwest::Client;

use super::config::SubmissionConfig;
use super::payload::ResultPayloadV1;
use crate::error::SendError;

/// One network send of a result payload.
#[async_trait]
pub trait ResultSender: Send + Sync {
    /// # Errors
    ///
    /// Returns `SendError` on transport failures, timeouts or a non-success status.
    async fn send(&self, payload: &ResultPayloadV1) -> Result<(), SendError>;
}

/// Posts payloads as JSON. The response body is never read.
#[derive(Clone)]
pub struct HttpResultSender {
    client: Client,
    endpoint_url: String,
}

impl HttpResultSender {
    /// # Errors
    ///
    /// Returns `SendError::Http` if the HTTP client cannot be built.
    pub fn new(config: &SubmissionConfig) -> Result<Self, SendError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
        })
    }
}

#[async_trait]
impl ResultSender for HttpResultSender {
    async fn send(&self, payload: &ResultPayloadV1) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SendError::HttpStatus(response.status()));
        }
        Ok(())
    }
}
