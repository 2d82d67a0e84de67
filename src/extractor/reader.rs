use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::links::is_acceptable_link;
use crate::text::{clean_text, normalize_url};

pub const MISSING_TITLE: &str = "No title found";

// Subtrees that never carry company copy
const SKIPPED_TAGS: [&str; 7] = ["script", "style", "img", "input", "nav", "footer", "header"];

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

pub fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| clean_text(&title.text().collect::<String>()))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| MISSING_TITLE.to_string())
}

/// Visible body text with boilerplate subtrees removed.
pub fn extract_body_text(document: &Html) -> String {
    let Some(body) = document.select(&BODY_SELECTOR).next() else {
        return String::new();
    };

    let mut fragments = Vec::new();
    collect_text(body, &mut fragments);
    clean_text(&fragments.join("\n"))
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let text = text.trim();
            if !text.is_empty() {
                out.push(text.to_string());
            }
        } else if let Some(child_element) = ElementRef::wrap(child)
            && !SKIPPED_TAGS.contains(&child_element.value().name())
        {
            collect_text(child_element, out);
        }
    }
}

/// Absolute, de-duplicated links in document order. Links whose target or
/// anchor text marks them as downloads or boilerplate are dropped.
pub fn extract_links(document: &Html, base_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&LINK_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(absolute) = normalize_url(base_url, href) else {
            continue;
        };
        if seen.contains(&absolute) {
            continue;
        }

        // A rejected anchor must not shadow a later acceptable one
        let anchor_text = anchor.text().collect::<String>();
        if is_acceptable_link(&absolute, &anchor_text) {
            seen.insert(absolute.clone());
            links.push(absolute);
        }
    }

    links
}
