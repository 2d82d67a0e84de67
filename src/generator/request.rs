use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BrochureError;
use crate::language::Language;

pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 20_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub company_name: String,
    pub website_url: String,
    pub language: Language,
    pub use_few_shot: bool,
    pub stream_output: bool,
    pub max_content_length: usize,
    pub save_metadata: bool,
}

impl GenerationRequest {
    pub fn new(company_name: impl Into<String>, website_url: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            website_url: website_url.into(),
            language: Language::default(),
            use_few_shot: true,
            stream_output: false,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            save_metadata: true,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_max_content_length(mut self, max_content_length: usize) -> Self {
        self.max_content_length = max_content_length;
        self
    }

    pub fn with_few_shot(mut self, use_few_shot: bool) -> Self {
        self.use_few_shot = use_few_shot;
        self
    }

    pub fn with_streaming(mut self, stream_output: bool) -> Self {
        self.stream_output = stream_output;
        self
    }

    pub fn with_metadata(mut self, save_metadata: bool) -> Self {
        self.save_metadata = save_metadata;
        self
    }

    /// Rejects requests that cannot succeed. Runs before any network call.
    pub fn validate(&self) -> Result<(), BrochureError> {
        if self.company_name.trim().is_empty() {
            return Err(BrochureError::Validation(
                "Company name cannot be empty".to_string(),
            ));
        }

        let url = self.website_url.trim();
        if url.is_empty() {
            return Err(BrochureError::Validation(
                "Website URL cannot be empty".to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BrochureError::Validation(format!(
                "Website URL must start with http:// or https://: {url}"
            )));
        }

        if self.max_content_length == 0 {
            return Err(BrochureError::Validation(
                "Maximum content length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub use_few_shot: bool,
    pub stream_output: bool,
    pub max_content_length: usize,
}

impl From<&GenerationRequest> for GenerationOptions {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            use_few_shot: request.use_few_shot,
            stream_output: request.stream_output,
            max_content_length: request.max_content_length,
        }
    }
}

/// Record of one generation, written next to the brochure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub company_name: String,
    pub website_url: String,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub language: Language,
    pub model: String,
    pub provider: String,
    pub main_page_scraped: bool,
    pub additional_pages_count: usize,
    pub additional_pages_urls: Vec<String>,
    pub total_content_length: usize,
    pub source_language: Option<String>,
    pub content_issues: Vec<String>,
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub content: String,
    /// `None` when the brochure could not be written.
    pub file_path: Option<PathBuf>,
    pub metadata: GenerationMetadata,
    pub elapsed_seconds: f64,
    pub word_count: usize,
}
