pub mod model;
pub mod reader;

#[cfg(test)]
mod tests;

pub use model::PageContent;

use scraper::Html;
use tracing::debug;

use crate::fetcher::types::PageResponse;

/// Parses a fetched document into [`PageContent`]. Links resolve against the
/// final URL so redirects do not break relative hrefs.
pub fn extract(resp: &PageResponse, requested_url: &str) -> PageContent {
    let document = Html::parse_document(&resp.body_utf8);
    let base_url = resp.url_final.as_str();

    let content = PageContent {
        url: requested_url.to_string(),
        title: reader::extract_title(&document),
        body: reader::extract_body_text(&document),
        outbound_links: reader::extract_links(&document, base_url),
    };

    debug!(
        url = requested_url,
        chars = content.body.chars().count(),
        links = content.outbound_links.len(),
        "Extracted page content"
    );
    content
}
