use chrono::Utc;
use reqwest::StatusCode;
use url::Url;

use crate::extractor::{extract, reader::MISSING_TITLE};
use crate::fetcher::types::PageResponse;

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>  Acme Robotics  </title>
  <style>body { color: red; }</style>
  <script>var tracking = "should not appear";</script>
</head>
<body>
  <header>Top banner</header>
  <nav><a href="/about">About</a><a href="/blog">Blog</a></nav>
  <main>
    <h1>Robots for every warehouse</h1>
    <p>Acme builds   autonomous
       pickers.</p>
    <img src="/hero.png" alt="hero">
    <a href="/careers">Join our team</a>
    <a href="https://acme.com/careers">Careers again</a>
    <a href="/privacy">Privacy Policy</a>
    <a href="/brochure.pdf">Download</a>
    <a href="mailto:hi@acme.com">Email us</a>
  </main>
  <footer>Copyright Acme</footer>
</body>
</html>"#;

fn create_test_response(html: &str, url: &str) -> PageResponse {
    PageResponse {
        url_final: Url::parse(url).unwrap(),
        status: StatusCode::OK,
        body_utf8: html.to_string(),
        encoding: "UTF-8",
        fetched_at: Utc::now(),
    }
}

#[test]
fn test_extract_landing_page() {
    let response = create_test_response(LANDING_PAGE, "https://acme.com/");
    let content = extract(&response, "https://acme.com");

    assert_eq!(content.url, "https://acme.com");
    assert_eq!(content.title, "Acme Robotics");
    assert!(content.body.contains("Robots for every warehouse"));
    assert!(content.body.contains("Acme builds autonomous pickers."));
    assert!(!content.body.contains("Top banner"));
    assert!(!content.body.contains("Copyright"));
    assert!(!content.body.contains("tracking"));
    assert!(!content.body.contains("color: red"));
}

#[test]
fn test_links_are_resolved_filtered_and_deduplicated() {
    let response = create_test_response(LANDING_PAGE, "https://acme.com/");
    let content = extract(&response, "https://acme.com");

    assert_eq!(
        content.outbound_links,
        vec![
            "https://acme.com/about".to_string(),
            "https://acme.com/blog".to_string(),
            "https://acme.com/careers".to_string(),
        ]
    );
}

#[test]
fn test_links_resolve_against_final_url() {
    let html = r#"<html><body><a href="team">Team</a></body></html>"#;
    let response = create_test_response(html, "https://www.acme.com/company/");
    let content = extract(&response, "https://acme.com/company");

    assert_eq!(
        content.outbound_links,
        vec!["https://www.acme.com/company/team".to_string()]
    );
}

#[test]
fn test_missing_title_uses_placeholder() {
    let html = "<html><body><p>Just text</p></body></html>";
    let content = extract(&create_test_response(html, "https://acme.com"), "https://acme.com");

    assert_eq!(content.title, MISSING_TITLE);
    assert_eq!(content.body, "Just text");
}

#[test]
fn test_empty_document() {
    let content = extract(&create_test_response("", "https://acme.com"), "https://acme.com");
    assert_eq!(content.title, MISSING_TITLE);
    assert!(content.body.is_empty());
    assert!(content.outbound_links.is_empty());
}

#[test]
fn test_formatted_block() {
    let html = "<html><head><title>Acme</title></head><body>Hello</body></html>";
    let content = extract(&create_test_response(html, "https://acme.com"), "https://acme.com");
    assert_eq!(
        content.formatted(),
        "Webpage Title:\nAcme\nWebpage Contents:\nHello\n\n"
    );
}

#[test]
fn test_rejected_anchor_does_not_hide_later_duplicate() {
    let html = r#"<html><body>
        <a href="/about">Legal notice</a>
        <a href="/about">About us</a>
        <a href="https://acme.com/about">About again</a>
    </body></html>"#;
    let response = create_test_response(html, "https://acme.com/");
    let content = extract(&response, "https://acme.com");

    assert_eq!(content.outbound_links, vec!["https://acme.com/about".to_string()]);
}
