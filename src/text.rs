//! Pure text helpers shared by the scraper, the content assembler and the
//! file store.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

/// Appended to content that had to be hard-cut. A truncated result is
/// therefore up to `ELLIPSIS.len()` characters longer than the budget.
pub const ELLIPSIS: &str = "...";

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];
const SENTENCE_CUT_THRESHOLD: f64 = 0.8;

const UNTITLED: &str = "untitled";
const UNKNOWN_COMPANY: &str = "Unknown Company";
const LEGAL_SUFFIXES: [&str; 5] = ["inc", "corp", "ltd", "llc", "co"];
const REJECTED_SCHEMES: [&str; 4] = ["mailto:", "tel:", "javascript:", "#"];

const MIN_QUALITY_WORDS: usize = 10;
const MAX_QUALITY_CHARS: usize = 50_000;

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static UNSAFE_FILENAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static UNDERSCORE_RUN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());
static KEYWORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap());

const STOP_WORDS: [&str; 40] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "can", "this", "that", "these", "those",
    "from", "not",
];

/// Collapses whitespace runs to one space, drops characters that did not
/// survive decoding (replacement and non-whitespace control characters) and
/// trims. Idempotent.
pub fn clean_text(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER && (!c.is_control() || c.is_whitespace()))
        .collect();

    WHITESPACE_REGEX.replace_all(&kept, " ").trim().to_string()
}

/// Truncates `content` to `max_len` characters.
///
/// When the last sentence terminator inside the budget sits at or beyond 80%
/// of it, the content is cut right after that terminator. Otherwise the first
/// `max_len` characters are kept and [`ELLIPSIS`] is appended, so the result
/// can exceed `max_len` by the marker length.
pub fn truncate(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        return content.to_string();
    }

    let head: Vec<char> = content.chars().take(max_len).collect();
    let threshold = max_len as f64 * SENTENCE_CUT_THRESHOLD;

    if let Some(pos) = head.iter().rposition(|c| SENTENCE_TERMINATORS.contains(c))
        && pos as f64 >= threshold
    {
        return head[..=pos].iter().collect();
    }

    let mut cut: String = head.into_iter().collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Resolves `href` against `base`, returning `None` for non-navigational
/// links and for results without a host.
pub fn normalize_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || REJECTED_SCHEMES.iter().any(|s| href.starts_with(s)) {
        return None;
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        let parsed = Url::parse(href).ok()?;
        return parsed.host_str().map(|_| href.to_string());
    }

    let joined = Url::parse(base).ok()?.join(href).ok()?;
    joined.host_str()?;
    Some(joined.to_string())
}

/// Network location (`host[:port]`) of `url`. Falls back to the input when
/// it cannot be parsed or has no host.
pub fn extract_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}

pub fn sanitize_filename(name: &str) -> String {
    let replaced = UNSAFE_FILENAME_REGEX.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUN_REGEX.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches(|c| c == '_' || c == '.');

    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Title-cases each word, upper-casing legal-entity suffixes (`Inc.`,
/// `LLC`, ...) instead.
pub fn format_company_name(name: &str) -> String {
    let cleaned = clean_text(name);
    if cleaned.is_empty() {
        return UNKNOWN_COMPANY.to_string();
    }

    cleaned
        .split(' ')
        .map(|word| {
            let bare = word.to_lowercase();
            let bare = bare.trim_end_matches(['.', ',']);
            if LEGAL_SUFFIXES.contains(&bare) {
                word.to_uppercase()
            } else {
                title_case(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// Upper-cases every letter that follows a non-letter, lower-cases the rest.
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_is_letter = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Most frequent non-stop-words of three or more ASCII letters. Ties keep
/// first-appearance order.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for m in KEYWORD_REGEX.find_iter(&lowered) {
        let word = m.as_str();
        if STOP_WORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // sort_by is stable, so equal counts stay in appearance order
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(max_keywords)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentQuality {
    pub is_valid: bool,
    pub word_count: usize,
    pub char_count: usize,
    pub issues: Vec<String>,
}

pub fn validate_content_quality(content: &str) -> ContentQuality {
    if content.is_empty() {
        return ContentQuality {
            is_valid: false,
            word_count: 0,
            char_count: 0,
            issues: vec!["Content is empty".to_string()],
        };
    }

    let word_count = content.split_whitespace().count();
    let char_count = content.chars().count();
    let mut issues = Vec::new();

    if word_count < MIN_QUALITY_WORDS {
        issues.push(format!(
            "Content too short (less than {MIN_QUALITY_WORDS} words)"
        ));
    }
    if char_count > MAX_QUALITY_CHARS {
        issues.push("Content too long (over 50,000 characters)".to_string());
    }
    if content.contains(char::REPLACEMENT_CHARACTER) {
        issues.push("Content contains encoding issues".to_string());
    }

    ContentQuality {
        is_valid: issues.is_empty(),
        word_count,
        char_count,
        issues,
    }
}
