use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, instrument};

use super::ProviderError;
use super::sse::{self, ChunkStream};

/// A JSON POST aimed at a vendor endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, request: &HttpRequest) -> Result<Value, ProviderError>;

    /// Opens a server-sent-events response and yields its JSON payloads.
    async fn post_stream(&self, request: &HttpRequest) -> Result<ChunkStream, ProviderError>;
}

pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        // The total timeout is applied per call so long streams are bounded
        // by read inactivity instead.
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .read_timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn build(&self, request: &HttpRequest) -> RequestBuilder {
        request
            .headers
            .iter()
            .fold(self.client.post(&request.url), |builder, (name, value)| {
                builder.header(*name, value)
            })
            .json(&request.body)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::for_status(status, error_message(&body)))
}

/// Vendor error bodies look like `{"error": {"message": ...}}`; anything else
/// is passed through verbatim.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(url = %request.url))]
    async fn post_json(&self, request: &HttpRequest) -> Result<Value, ProviderError> {
        let response = self
            .build(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ProviderError::from_reqwest_error)?;
        let response = ensure_success(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(ProviderError::from_reqwest_error)?;
        debug!(bytes = body.len(), "Received completion");
        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(skip_all, fields(url = %request.url))]
    async fn post_stream(&self, request: &HttpRequest) -> Result<ChunkStream, ProviderError> {
        let response = self
            .build(request)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(ProviderError::from_reqwest_error)?;
        let response = ensure_success(response).await?;

        debug!("Opened completion stream");
        Ok(sse::json_events(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_vendor_field() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
