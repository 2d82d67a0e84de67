//! Website scraping: fetch with retries, then extract.

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::extractor::{self, PageContent};
use crate::fetcher::{self, FetchError};
use crate::links;
use crate::retry::RetryPolicy;

const DEFAULT_CONCURRENCY: usize = 4;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Fetches and parses one page. `None` means the page could not be
    /// retrieved or parsed; the cause has been logged.
    async fn scrape_website(&self, url: &str) -> Option<PageContent>;

    /// Scrapes every URL, returning successful pages in input order.
    async fn scrape_multiple(&self, urls: &[String]) -> Vec<PageContent>;

    fn filter_relevant_links(&self, links: &[String], base_domain: &str) -> Vec<String>;

    /// Releases the underlying HTTP resources. Idempotent.
    fn close(&self);
}

/// Closes the wrapped scraper when dropped, on success and error paths alike.
pub struct ScrapeSession {
    scraper: Arc<dyn Scraper>,
}

impl ScrapeSession {
    pub fn new(scraper: Arc<dyn Scraper>) -> Self {
        Self { scraper }
    }
}

impl Deref for ScrapeSession {
    type Target = dyn Scraper;

    fn deref(&self) -> &Self::Target {
        self.scraper.as_ref()
    }
}

impl Drop for ScrapeSession {
    fn drop(&mut self) {
        self.scraper.close();
    }
}

/// HTTP scraper. The client is created on first use and dropped by
/// [`Scraper::close`]; a later scrape builds a fresh one.
pub struct WebsiteScraper {
    timeout: Duration,
    retry: RetryPolicy,
    concurrency: usize,
    client: Mutex<Option<Client>>,
}

impl WebsiteScraper {
    pub fn new(config: &Config) -> Self {
        Self {
            timeout: config.request_timeout(),
            retry: RetryPolicy::new(config.max_retries()),
            concurrency: DEFAULT_CONCURRENCY,
            client: Mutex::new(None),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn is_open(&self) -> bool {
        self.lock_client().is_some()
    }

    fn lock_client(&self) -> MutexGuard<'_, Option<Client>> {
        self.client.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_client(&self) -> Result<Client, FetchError> {
        let mut slot = self.lock_client();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = fetcher::build_client(self.timeout)?;
        debug!("Opened HTTP session");
        *slot = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Scraper for WebsiteScraper {
    #[instrument(skip(self))]
    async fn scrape_website(&self, url: &str) -> Option<PageContent> {
        let client = match self.session_client() {
            Ok(client) => client,
            Err(err) => {
                warn!(error = %err, "Could not open HTTP session");
                return None;
            }
        };

        match self
            .retry
            .run("fetch", || fetcher::fetch(&client, url))
            .await
        {
            Ok(response) => {
                let content = extractor::extract(&response, url);
                info!(url, "Scraped page");
                Some(content)
            }
            Err(err) => {
                warn!(url, error = %err, "Failed to scrape page");
                None
            }
        }
    }

    async fn scrape_multiple(&self, urls: &[String]) -> Vec<PageContent> {
        let pages: Vec<PageContent> = stream::iter(urls.iter().cloned())
            .map(|url| async move { self.scrape_website(&url).await })
            .buffered(self.concurrency)
            .filter_map(future::ready)
            .collect()
            .await;

        info!(
            requested = urls.len(),
            scraped = pages.len(),
            "Scraped additional pages"
        );
        pages
    }

    fn filter_relevant_links(&self, links: &[String], base_domain: &str) -> Vec<String> {
        links::filter_relevant_links(links, base_domain)
    }

    fn close(&self) {
        if self.lock_client().take().is_some() {
            debug!("Closed HTTP session");
        }
    }
}
