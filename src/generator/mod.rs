//! Runs one brochure generation end to end: scrape the landing page, let the
//! model pick secondary pages, scrape those, assemble the prompt document and
//! generate (blocking or streamed).

mod request;

pub use request::{
    DEFAULT_MAX_CONTENT_LENGTH, GenerationMetadata, GenerationOptions, GenerationRequest,
    GenerationResult,
};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{error, info, instrument, warn};

use crate::assembler::combine;
use crate::config::{Config, ProviderKind};
use crate::error::BrochureError;
use crate::extractor::PageContent;
use crate::language::{Language, detect_language};
use crate::links::RelevantLink;
use crate::providers::{LanguageModel, ModelInfo, ProviderClient, TextStream};
use crate::scraping::{ScrapeSession, Scraper, WebsiteScraper};
use crate::storage::{FileStore, Persistence};
use crate::text::{extract_domain, format_company_name, validate_content_quality};

/// Items of a streamed generation. A successful stream always ends with
/// exactly one `Completed`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Fragment(String),
    Completed(Box<GenerationResult>),
}

pub type GenerationStream = BoxStream<'static, Result<GenerationEvent, BrochureError>>;

/// Assembled prompt document plus what we learned while building it.
struct PreparedContent {
    document: String,
    additional_urls: Vec<String>,
    source_language: Option<String>,
    issues: Vec<String>,
}

/// Everything needed to turn generated text into a [`GenerationResult`],
/// detached from the generator so a stream can own it.
struct Finalizer {
    store: Arc<dyn Persistence>,
    model: ModelInfo,
    request: GenerationRequest,
    company: String,
    prepared: PreparedContent,
    started: Instant,
}

impl Finalizer {
    async fn finish(self, content: String) -> GenerationResult {
        let elapsed_seconds = self.started.elapsed().as_secs_f64();
        let word_count = content.split_whitespace().count();

        let metadata = GenerationMetadata {
            company_name: self.company.clone(),
            website_url: self.request.website_url.clone(),
            generated_at: Utc::now(),
            duration_seconds: elapsed_seconds,
            language: self.request.language,
            model: self.model.model,
            provider: self.model.provider,
            main_page_scraped: true,
            additional_pages_count: self.prepared.additional_urls.len(),
            additional_pages_urls: self.prepared.additional_urls,
            total_content_length: self.prepared.document.chars().count(),
            source_language: self.prepared.source_language,
            content_issues: self.prepared.issues,
            options: GenerationOptions::from(&self.request),
        };

        let file_path = persist(
            self.store,
            content.clone(),
            metadata.clone(),
            self.company,
            self.request.language,
            self.request.save_metadata,
        )
        .await;

        info!(
            words = word_count,
            seconds = elapsed_seconds,
            "Brochure generated successfully"
        );

        GenerationResult {
            content,
            file_path,
            metadata,
            elapsed_seconds,
            word_count,
        }
    }
}

/// Writes the brochure, and the metadata when requested, on the blocking
/// pool. Failures are logged; the brochure path is `None` when it was not
/// saved.
async fn persist(
    store: Arc<dyn Persistence>,
    content: String,
    metadata: GenerationMetadata,
    company: String,
    language: Language,
    save_metadata: bool,
) -> Option<PathBuf> {
    let task = tokio::task::spawn_blocking(move || {
        let file_path = match store.save_brochure(&content, &company, language) {
            Ok(path) => Some(path),
            Err(err) => {
                error!(error = %err, "Failed to save brochure");
                None
            }
        };

        if save_metadata
            && let Err(err) = store.save_metadata(&metadata, &company)
        {
            warn!(error = %err, "Failed to save metadata");
        }
        file_path
    });

    match task.await {
        Ok(file_path) => file_path,
        Err(err) => {
            error!(error = %err, "Persistence task failed");
            None
        }
    }
}

struct StreamState {
    fragments: TextStream,
    content: String,
    finalizer: Option<Finalizer>,
}

pub struct BrochureGenerator {
    model: Arc<dyn LanguageModel>,
    scraper: Arc<dyn Scraper>,
    store: Arc<dyn Persistence>,
}

impl BrochureGenerator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        scraper: Arc<dyn Scraper>,
        store: Arc<dyn Persistence>,
    ) -> Self {
        Self {
            model,
            scraper,
            store,
        }
    }

    /// Production wiring: HTTP provider client, website scraper and file store.
    pub fn from_config(
        config: &Config,
        provider: ProviderKind,
        model_override: Option<&str>,
    ) -> Result<Self, BrochureError> {
        let model = ProviderClient::from_config(config, provider, model_override)?;
        let scraper = WebsiteScraper::new(config);
        let store = FileStore::new(config.output_dir())?;
        Ok(Self::new(Arc::new(model), Arc::new(scraper), Arc::new(store)))
    }

    #[instrument(skip_all, fields(company = %request.company_name, url = %request.website_url))]
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, BrochureError> {
        self.run_generate(request)
            .await
            .inspect_err(|err| error!(error = %err, "Brochure generation failed"))
    }

    async fn run_generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, BrochureError> {
        let started = Instant::now();
        request.validate()?;
        info!("Starting brochure generation");

        let prepared = self.prepare(request).await?;
        let company = format_company_name(&request.company_name);

        let content = if request.stream_output {
            let mut fragments = self
                .model
                .stream_brochure_generation(
                    &company,
                    &prepared.document,
                    request.language,
                    request.use_few_shot,
                )
                .await?;
            let mut content = String::new();
            while let Some(fragment) = fragments.next().await {
                content.push_str(&fragment?);
            }
            content
        } else {
            self.model
                .generate_brochure(
                    &company,
                    &prepared.document,
                    request.language,
                    request.use_few_shot,
                )
                .await?
        };

        Ok(self.finalizer(request, company, prepared, started).finish(content).await)
    }

    /// Streams fragments as the model produces them, then one `Completed`
    /// event carrying the saved result. Scraping has finished (and the
    /// scraper is closed) by the time the first fragment arrives.
    #[instrument(skip_all, fields(company = %request.company_name, url = %request.website_url))]
    pub async fn stream(&self, request: &GenerationRequest) -> Result<GenerationStream, BrochureError> {
        self.open_stream(request)
            .await
            .inspect_err(|err| error!(error = %err, "Streaming brochure generation failed"))
    }

    async fn open_stream(&self, request: &GenerationRequest) -> Result<GenerationStream, BrochureError> {
        let started = Instant::now();
        request.validate()?;
        info!("Starting streaming brochure generation");

        let prepared = self.prepare(request).await?;
        let company = format_company_name(&request.company_name);
        let fragments = self
            .model
            .stream_brochure_generation(
                &company,
                &prepared.document,
                request.language,
                request.use_few_shot,
            )
            .await?;

        let state = StreamState {
            fragments,
            content: String::new(),
            finalizer: Some(self.finalizer(request, company, prepared, started)),
        };

        let events = stream::unfold(state, |mut state| async move {
            let finalizer = state.finalizer.take()?;
            match state.fragments.next().await {
                Some(Ok(fragment)) => {
                    state.content.push_str(&fragment);
                    state.finalizer = Some(finalizer);
                    Some((Ok(GenerationEvent::Fragment(fragment)), state))
                }
                Some(Err(err)) => {
                    error!(error = %err, "Brochure stream interrupted");
                    Some((Err(err.into()), state))
                }
                None => {
                    let result = finalizer.finish(std::mem::take(&mut state.content)).await;
                    Some((Ok(GenerationEvent::Completed(Box::new(result))), state))
                }
            }
        });

        Ok(events.boxed())
    }

    fn finalizer(
        &self,
        request: &GenerationRequest,
        company: String,
        prepared: PreparedContent,
        started: Instant,
    ) -> Finalizer {
        Finalizer {
            store: Arc::clone(&self.store),
            model: self.model.model_info(),
            request: request.clone(),
            company,
            prepared,
            started,
        }
    }

    /// Scrape, select and assemble. The scraper is closed when this returns,
    /// whether it succeeds or not.
    async fn prepare(&self, request: &GenerationRequest) -> Result<PreparedContent, BrochureError> {
        let scraper = ScrapeSession::new(Arc::clone(&self.scraper));
        let website_url = request.website_url.trim();

        info!("Scraping main website");
        let primary = scraper
            .scrape_website(website_url)
            .await
            .ok_or_else(|| BrochureError::Scrape {
                url: website_url.to_string(),
            })?;

        let selected = self
            .select_links(&*scraper, website_url, &primary, request.use_few_shot)
            .await;
        let secondary = self.scrape_secondary(&*scraper, selected).await;

        let document = combine(&primary, &secondary, request.max_content_length);
        let quality = validate_content_quality(&document);
        for issue in &quality.issues {
            warn!(issue = %issue, "Content quality issue");
        }

        Ok(PreparedContent {
            additional_urls: secondary.into_iter().map(|page| page.url).collect(),
            source_language: detect_language(&primary.body),
            issues: quality.issues,
            document,
        })
    }

    async fn select_links(
        &self,
        scraper: &dyn Scraper,
        website_url: &str,
        primary: &PageContent,
        use_few_shot: bool,
    ) -> Vec<RelevantLink> {
        let domain = extract_domain(website_url);
        let candidates = scraper.filter_relevant_links(&primary.outbound_links, &domain);
        if candidates.is_empty() {
            info!("No candidate links on the landing page");
            return Vec::new();
        }

        match self
            .model
            .extract_relevant_links(website_url, &candidates, use_few_shot)
            .await
        {
            Ok(mut links) => {
                let mut seen = HashSet::new();
                links.retain(|link| seen.insert(link.url.clone()));
                info!(candidates = candidates.len(), selected = links.len(), "Selected links");
                links
            }
            Err(err) => {
                warn!(error = %err, "Link selection failed, continuing with the landing page only");
                Vec::new()
            }
        }
    }

    async fn scrape_secondary(
        &self,
        scraper: &dyn Scraper,
        selected: Vec<RelevantLink>,
    ) -> Vec<PageContent> {
        if selected.is_empty() {
            return Vec::new();
        }

        let urls: Vec<String> = selected.into_iter().map(|link| link.url).collect();
        let pages = scraper.scrape_multiple(&urls).await;
        for url in &urls {
            if !pages.iter().any(|page| &page.url == url) {
                warn!(url = %url, "Omitting page that could not be scraped");
            }
        }
        pages
    }

    pub async fn verify_connection(&self) -> bool {
        self.model.test_connection().await
    }

    pub fn model_info(&self) -> ModelInfo {
        self.model.model_info()
    }

    pub fn supported_languages(&self) -> &'static [Language] {
        &Language::ALL
    }

    pub fn cleanup_files(&self, days: Option<u32>) -> Result<usize, BrochureError> {
        Ok(self.store.cleanup_older_than(days)?)
    }
}
