//! LLM provider clients.
//!
//! A [`Backend`] knows one vendor's wire format. [`ProviderClient`] owns the
//! shared flow on top of it (retry, prompting, link parsing, streaming) and
//! is what the generator talks to through [`LanguageModel`].

pub mod anthropic;
pub mod client;
pub mod errors;
pub mod openai;
pub mod prompts;
pub mod sse;
pub mod transport;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use anthropic::Anthropic;
pub use client::ProviderClient;
pub use errors::ProviderError;
pub use openai::OpenAi;
pub use transport::{HttpRequest, HttpTransport, Transport};

use crate::config::{ProviderConfig, ProviderKind};
use crate::language::Language;
use crate::links::RelevantLink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub json_response: bool,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            system_prompt: None,
            json_response: false,
            stream: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json_response = true;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Vendor-specific request shaping and response reading.
pub trait Backend: Send + Sync {
    fn kind(&self) -> ProviderKind;
    fn model(&self) -> &str;
    fn default_base_url(&self) -> &'static str;
    /// Offline plausibility check of the credential; makes no request.
    fn validate_api_key_format(&self) -> bool;
    fn build_request(&self, base_url: &str, request: &CompletionRequest) -> HttpRequest;
    fn extract_response_text(&self, response: &Value) -> Result<String, ProviderError>;
    /// Text carried by one stream event, if any.
    fn extract_stream_chunk_text(&self, chunk: &Value) -> Option<String>;
    /// Error reported in-band by one stream event.
    fn stream_chunk_error(&self, chunk: &Value) -> Option<ProviderError>;
    /// Whether `chunk` is the vendor's final event of a complete response.
    fn is_stream_end(&self, _chunk: &Value) -> bool {
        false
    }
}

/// `message` of a vendor error object, or the whole object when absent.
fn vendor_error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

pub fn backend_for(config: &ProviderConfig) -> Arc<dyn Backend> {
    match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAi::new(&config.api_key, &config.model)),
        ProviderKind::Anthropic => Arc::new(Anthropic::new(&config.api_key, &config.model)),
    }
}

/// Generated text fragments in arrival order.
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    pub provider: String,
    pub api_key_valid: bool,
    pub max_retries: u32,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_info(&self) -> ModelInfo;

    /// Asks the model which of `links` (first 20 only) are worth scraping.
    async fn extract_relevant_links(
        &self,
        website_url: &str,
        links: &[String],
        use_few_shot: bool,
    ) -> Result<Vec<RelevantLink>, ProviderError>;

    async fn generate_brochure(
        &self,
        company_name: &str,
        content: &str,
        language: Language,
        use_few_shot: bool,
    ) -> Result<String, ProviderError>;

    async fn stream_brochure_generation(
        &self,
        company_name: &str,
        content: &str,
        language: Language,
        use_few_shot: bool,
    ) -> Result<TextStream, ProviderError>;

    /// Sends a trivial prompt; never fails, only reports.
    async fn test_connection(&self) -> bool;
}
