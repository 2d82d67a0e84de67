use chrono::Utc;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::fetcher::types::PageResponse;

const SNIFF_WINDOW: usize = 4096;

static CHARSET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

/// Decodes the body using the first encoding found in the Content-Type header,
/// a `<meta>` declaration, or a statistical guess, in that order.
pub fn process_response(
    url_final: Url,
    status: StatusCode,
    body_bytes: &[u8],
    content_type: &str,
) -> PageResponse {
    let encoding = detect_encoding(content_type, body_bytes);
    let body_utf8 = decode_to_utf8(body_bytes, encoding);

    PageResponse {
        url_final,
        status,
        body_utf8,
        encoding: encoding.name(),
        fetched_at: Utc::now(),
    }
}

fn label_to_encoding(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

fn detect_encoding(content_type: &str, body_bytes: &[u8]) -> &'static Encoding {
    if let Some(encoding) = label_to_encoding(&CHARSET_REGEX, content_type) {
        return encoding;
    }

    let head = &body_bytes[..body_bytes.len().min(SNIFF_WINDOW)];
    let head_str = String::from_utf8_lossy(head);

    // Covers both <meta charset> and the http-equiv content="...; charset=" form
    if let Some(encoding) = label_to_encoding(&META_CHARSET_REGEX, &head_str) {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, body_bytes.len() <= SNIFF_WINDOW);
    detector.guess(None, true)
}

/// Malformed sequences become U+FFFD, which text cleaning strips later.
fn decode_to_utf8(body_bytes: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, used, had_errors) = encoding.decode(body_bytes);
    if had_errors {
        debug!(encoding = used.name(), "Body contained undecodable sequences");
    }
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_encoding_from_content_type() {
        let body = b"<html><head><title>Test</title></head></html>";
        let encoding = detect_encoding("text/html; charset=utf-8", body);
        assert_eq!(encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn test_detect_encoding_from_meta_tag() {
        let body = b"<html><head><meta charset=\"iso-8859-1\"><title>Test</title></head></html>";
        // encoding_rs maps ISO-8859-1 to its windows-1252 superset
        assert_eq!(detect_encoding("text/html", body), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn test_detect_encoding_from_meta_http_equiv() {
        let body = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=shift_jis\"></head></html>";
        assert_eq!(detect_encoding("text/html", body), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn test_decode_latin1() {
        let body = b"caf\xe9";
        assert_eq!(decode_to_utf8(body, encoding_rs::WINDOWS_1252), "café");
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let decoded = decode_to_utf8(b"ok \xff\xfe end", encoding_rs::UTF_8);
        assert!(decoded.starts_with("ok "));
        assert!(decoded.ends_with(" end"));
        assert!(decoded.contains('\u{FFFD}'));
    }
}
