use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use super::prompts::{self, BROCHURE_GENERATION_SYSTEM_PROMPT, LINK_EXTRACTION_SYSTEM_PROMPT};
use super::sse::{ChunkStream, StreamEvent};
use super::{
    Backend, CompletionRequest, HttpTransport, LanguageModel, Message, ModelInfo, ProviderError,
    TextStream, Transport, backend_for,
};
use crate::assembler::PageCategory;
use crate::config::{Config, ProviderConfig, ProviderKind};
use crate::error::BrochureError;
use crate::language::Language;
use crate::links::{MAX_CANDIDATE_LINKS, RelevantLink};
use crate::retry::RetryPolicy;
use crate::text::normalize_url;

#[derive(Debug, Deserialize)]
struct LinkSelection {
    #[serde(default)]
    links: Vec<SelectedLink>,
}

#[derive(Debug, Deserialize)]
struct SelectedLink {
    #[serde(rename = "type", default)]
    label: String,
    url: String,
}

pub struct ProviderClient {
    backend: Arc<dyn Backend>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    base_url: String,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self, BrochureError> {
        if config.api_key.trim().is_empty() {
            return Err(BrochureError::Configuration(format!(
                "{} API key is empty",
                config.kind.display_name()
            )));
        }

        let backend = backend_for(&config);
        info!(
            "Initialized {} model: {}",
            config.kind.display_name(),
            config.model
        );

        Ok(Self {
            base_url: backend.default_base_url().to_string(),
            retry: RetryPolicy::new(config.max_retries),
            backend,
            transport,
        })
    }

    /// Production client for `kind` using the configured credential.
    pub fn from_config(
        config: &Config,
        kind: ProviderKind,
        model_override: Option<&str>,
    ) -> Result<Self, BrochureError> {
        let provider = config.provider_config(kind, model_override)?;
        let transport = HttpTransport::new(config.request_timeout())?;
        Self::new(provider, Arc::new(transport))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.backend.kind()
    }

    pub fn validate_api_key_format(&self) -> bool {
        self.backend.validate_api_key_format()
    }

    /// Non-streaming completion, retried on transient failures.
    pub async fn create_completion(&self, request: &CompletionRequest) -> Result<Value, ProviderError> {
        let http = self.backend.build_request(&self.base_url, request);
        self.retry
            .run("completion", || self.transport.post_json(&http))
            .await
    }

    /// Opens a streamed completion. Only establishing the stream is retried.
    pub async fn create_stream(&self, request: &CompletionRequest) -> Result<ChunkStream, ProviderError> {
        let http = self.backend.build_request(&self.base_url, request);
        self.retry
            .run("stream", || self.transport.post_stream(&http))
            .await
    }

    pub fn extract_response_text(&self, response: &Value) -> Result<String, ProviderError> {
        self.backend.extract_response_text(response)
    }

    pub fn extract_stream_chunk_text(&self, chunk: &Value) -> Option<String> {
        self.backend.extract_stream_chunk_text(chunk)
    }

    fn brochure_request(
        &self,
        company_name: &str,
        content: &str,
        language: Language,
        use_few_shot: bool,
    ) -> CompletionRequest {
        let prompt = prompts::brochure_generation_prompt(company_name, content, language);
        let messages =
            prompts::with_examples(prompt, prompts::brochure_generation_examples(), use_few_shot);
        CompletionRequest::new(messages).with_system_prompt(BROCHURE_GENERATION_SYSTEM_PROMPT)
    }
}

/// Models sometimes wrap JSON in a markdown code fence.
fn json_payload(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_link_selection(text: &str, website_url: &str) -> Result<Vec<RelevantLink>, ProviderError> {
    let selection: LinkSelection = serde_json::from_str(json_payload(text))?;

    let mut seen = HashSet::new();
    let links = selection
        .links
        .into_iter()
        .filter_map(|link| {
            let url = normalize_url(website_url, &link.url)?;
            let category = match PageCategory::from_label(&link.label) {
                PageCategory::Other => PageCategory::from_url(&url),
                category => category,
            };
            Some(RelevantLink { category, url })
        })
        .filter(|link| seen.insert(link.url.clone()))
        .collect();

    Ok(links)
}

struct FragmentState {
    chunks: ChunkStream,
    backend: Arc<dyn Backend>,
    finished: bool,
}

/// Non-empty text deltas in arrival order. Stops cleanly at the vendor's
/// terminal event; an in-band error event, a read error, or a body that ends
/// before the terminal event is yielded as the last item.
fn text_fragments(chunks: ChunkStream, backend: Arc<dyn Backend>) -> TextStream {
    let state = FragmentState {
        chunks,
        backend,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            let err = match state.chunks.next().await {
                Some(Ok(StreamEvent::Done)) => return None,
                Some(Ok(StreamEvent::Data(chunk))) => {
                    if let Some(err) = state.backend.stream_chunk_error(&chunk) {
                        err
                    } else if state.backend.is_stream_end(&chunk) {
                        return None;
                    } else {
                        match state.backend.extract_stream_chunk_text(&chunk) {
                            Some(text) if !text.is_empty() => return Some((Ok(text), state)),
                            _ => continue,
                        }
                    }
                }
                Some(Err(err)) => err,
                None => ProviderError::Transport(
                    "stream ended before the response completed".to_string(),
                ),
            };

            error!(error = %err, "Brochure stream failed");
            state.finished = true;
            return Some((Err(err), state));
        }
    })
    .boxed()
}

#[async_trait]
impl LanguageModel for ProviderClient {
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model: self.backend.model().to_string(),
            provider: self.backend.kind().id().to_string(),
            api_key_valid: self.validate_api_key_format(),
            max_retries: self.retry.max_retries(),
        }
    }

    #[instrument(skip(self, links), fields(candidates = links.len()))]
    async fn extract_relevant_links(
        &self,
        website_url: &str,
        links: &[String],
        use_few_shot: bool,
    ) -> Result<Vec<RelevantLink>, ProviderError> {
        info!(
            "Extracting relevant links using {}",
            self.backend.kind().display_name()
        );

        let candidates = &links[..links.len().min(MAX_CANDIDATE_LINKS)];
        let prompt = prompts::link_extraction_prompt(website_url, candidates);
        let messages =
            prompts::with_examples(prompt, prompts::link_extraction_examples(), use_few_shot);
        let request = CompletionRequest::new(messages)
            .with_system_prompt(LINK_EXTRACTION_SYSTEM_PROMPT)
            .json();

        let result = async {
            let response = self.create_completion(&request).await?;
            let text = self.extract_response_text(&response)?;
            parse_link_selection(&text, website_url)
        }
        .await;

        match result {
            Ok(selected) => {
                info!("Extracted {} relevant links", selected.len());
                Ok(selected)
            }
            Err(err) => {
                error!(error = %err, "Failed to extract links");
                Err(err)
            }
        }
    }

    #[instrument(skip(self, content), fields(chars = content.len()))]
    async fn generate_brochure(
        &self,
        company_name: &str,
        content: &str,
        language: Language,
        use_few_shot: bool,
    ) -> Result<String, ProviderError> {
        let request = self.brochure_request(company_name, content, language, use_few_shot);

        let result = async {
            let response = self.create_completion(&request).await?;
            self.extract_response_text(&response)
        }
        .await;

        match result {
            Ok(brochure) => {
                info!(
                    "Brochure generated successfully with {}",
                    self.backend.kind().display_name()
                );
                Ok(brochure)
            }
            Err(err) => {
                error!(error = %err, "Failed to generate brochure");
                Err(err)
            }
        }
    }

    #[instrument(skip(self, content), fields(chars = content.len()))]
    async fn stream_brochure_generation(
        &self,
        company_name: &str,
        content: &str,
        language: Language,
        use_few_shot: bool,
    ) -> Result<TextStream, ProviderError> {
        let request = self
            .brochure_request(company_name, content, language, use_few_shot)
            .streaming();

        let chunks = self.create_stream(&request).await.inspect_err(|err| {
            error!(error = %err, "Failed to open brochure stream");
        })?;

        Ok(text_fragments(chunks, Arc::clone(&self.backend)))
    }

    async fn test_connection(&self) -> bool {
        let kind = self.backend.kind().display_name();
        info!("Testing {kind} API connection");

        let request = CompletionRequest::new(vec![Message::user(prompts::CONNECTION_TEST_PROMPT)]);
        let reply = async {
            let response = self.create_completion(&request).await?;
            self.extract_response_text(&response)
        }
        .await;

        match reply {
            Ok(text) if text.trim().to_uppercase().contains("OK") => {
                info!("{kind} API connection successful");
                true
            }
            Ok(text) => {
                warn!(reply = %text.trim(), "Unexpected {kind} connection test reply");
                false
            }
            Err(err) => {
                error!(error = %err, "{kind} API connection test failed");
                false
            }
        }
    }
}
