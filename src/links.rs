//! Cheap, deterministic link filtering that bounds the candidate set handed
//! to the model for relevance selection.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::assembler::PageCategory;

/// A link the model judged worth scraping for the brochure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantLink {
    pub category: PageCategory,
    pub url: String,
}

/// Upper bound on candidates handed to AI link selection.
pub const MAX_CANDIDATE_LINKS: usize = 20;

const RELEVANT_PATH_KEYWORDS: [&str; 16] = [
    "about",
    "company",
    "team",
    "careers",
    "jobs",
    "culture",
    "mission",
    "vision",
    "values",
    "history",
    "leadership",
    "services",
    "products",
    "solutions",
    "portfolio",
    "work",
];

const SKIPPED_EXTENSIONS: [&str; 9] = [
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".zip", ".jpg", ".png", ".gif",
];

const SKIPPED_PATTERNS: [&str; 7] = [
    "mailto:",
    "tel:",
    "javascript:",
    "#",
    "/search",
    "/login",
    "/register",
];

const IRRELEVANT_ANCHOR_WORDS: [&str; 7] = [
    "privacy",
    "terms",
    "cookie",
    "legal",
    "disclaimer",
    "support",
    "help",
];

/// Keeps same-domain links whose path mentions a company-info keyword, in
/// input order, capped at [`MAX_CANDIDATE_LINKS`].
pub fn filter_relevant_links(links: &[String], base_domain: &str) -> Vec<String> {
    links
        .iter()
        .filter(|link| is_relevant_link(link, base_domain))
        .take(MAX_CANDIDATE_LINKS)
        .cloned()
        .collect()
}

fn is_relevant_link(link: &str, base_domain: &str) -> bool {
    let Ok(parsed) = Url::parse(link) else {
        return false;
    };

    let netloc = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return false,
    };
    if !netloc.contains(base_domain) {
        return false;
    }

    let path = parsed.path().to_lowercase();
    RELEVANT_PATH_KEYWORDS.iter().any(|kw| path.contains(kw))
}

/// Acceptance predicate applied while collecting links from a page: skips
/// binary downloads, non-page targets and legal/support boilerplate.
pub fn is_acceptable_link(url: &str, anchor_text: &str) -> bool {
    let url = url.to_lowercase();
    if SKIPPED_EXTENSIONS.iter().any(|ext| url.ends_with(ext)) {
        return false;
    }
    if SKIPPED_PATTERNS.iter().any(|pattern| url.contains(pattern)) {
        return false;
    }

    let anchor = anchor_text.trim().to_lowercase();
    !IRRELEVANT_ANCHOR_WORDS
        .iter()
        .any(|word| anchor.contains(word))
}
