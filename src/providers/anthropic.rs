use serde_json::{Value, json};

use super::transport::HttpRequest;
use super::{Backend, CompletionRequest, ProviderError, vendor_error_message};
use crate::config::ProviderKind;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

const KEY_PREFIX: &str = "sk-ant-";
const MIN_KEY_LEN: usize = 21;
const MAX_TOKENS: u32 = 4000;

/// Anthropic messages API. There is no JSON response mode, so the
/// `json_response` flag is ignored and the prompt alone asks for JSON.
#[derive(Debug, Clone)]
pub struct Anthropic {
    api_key: String,
    model: String,
}

impl Anthropic {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl Backend for Anthropic {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn default_base_url(&self) -> &'static str {
        DEFAULT_BASE_URL
    }

    fn validate_api_key_format(&self) -> bool {
        self.api_key.starts_with(KEY_PREFIX) && self.api_key.len() >= MIN_KEY_LEN
    }

    fn build_request(&self, base_url: &str, request: &CompletionRequest) -> HttpRequest {
        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": request.messages,
            "stream": request.stream,
        });
        if let Some(system) = &request.system_prompt {
            body["system"] = json!(system);
        }

        HttpRequest {
            url: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            headers: vec![
                ("x-api-key", self.api_key.clone()),
                ("anthropic-version", API_VERSION.to_string()),
            ],
            body,
        }
    }

    fn extract_response_text(&self, response: &Value) -> Result<String, ProviderError> {
        response
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ProviderError::MissingField {
                path: "content[0].text",
            })
    }

    fn extract_stream_chunk_text(&self, chunk: &Value) -> Option<String> {
        chunk
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    fn stream_chunk_error(&self, chunk: &Value) -> Option<ProviderError> {
        if chunk.get("type").and_then(Value::as_str) != Some("error") {
            return None;
        }
        let message = chunk
            .get("error")
            .map(vendor_error_message)
            .unwrap_or_else(|| chunk.to_string());
        Some(ProviderError::Stream { message })
    }

    fn is_stream_end(&self, chunk: &Value) -> bool {
        chunk.get("type").and_then(Value::as_str) == Some("message_stop")
    }
}
