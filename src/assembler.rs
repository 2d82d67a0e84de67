//! Combines the landing page and the selected secondary pages into the single
//! bounded document sent to the model.

use serde::{Deserialize, Serialize};

use crate::extractor::PageContent;
use crate::text::truncate;

const LANDING_LABEL: &str = "Landing page";

/// Coarse role of a company web page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageCategory {
    About,
    Careers,
    Team,
    Products,
    Contact,
    Other,
}

impl PageCategory {
    /// Infers the category from URL substrings; the first match in the order
    /// about, careers/job, team, product/service, contact wins.
    pub fn from_url(url: &str) -> Self {
        Self::match_text(&url.to_lowercase())
    }

    /// Maps a free-form label such as `"careers page"` to a category.
    pub fn from_label(label: &str) -> Self {
        Self::match_text(&label.to_lowercase())
    }

    fn match_text(text: &str) -> Self {
        if text.contains("about") {
            Self::About
        } else if text.contains("career") || text.contains("job") {
            Self::Careers
        } else if text.contains("team") {
            Self::Team
        } else if text.contains("product") || text.contains("service") {
            Self::Products
        } else if text.contains("contact") {
            Self::Contact
        } else {
            Self::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::About => "About page",
            Self::Careers => "Careers page",
            Self::Team => "Team page",
            Self::Products => "Products page",
            Self::Contact => "Contact page",
            Self::Other => "Company page",
        }
    }
}

/// Builds the prompt document: the landing page, then every secondary page in
/// the given order under its category label, truncated to `max_length`.
pub fn combine(primary: &PageContent, secondary: &[PageContent], max_length: usize) -> String {
    let mut combined = format!("{LANDING_LABEL}:\n{}", primary.formatted());

    for page in secondary {
        let label = PageCategory::from_url(&page.url).label();
        combined.push_str(&format!("\n\n{label}:\n{}", page.formatted()));
    }

    truncate(&combined, max_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, title: &str, body: &str) -> PageContent {
        PageContent {
            url: url.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            outbound_links: Vec::new(),
        }
    }

    #[test]
    fn test_category_priority_order() {
        assert_eq!(
            PageCategory::from_url("https://a.com/about/careers"),
            PageCategory::About
        );
        assert_eq!(
            PageCategory::from_url("https://a.com/JOBS"),
            PageCategory::Careers
        );
        assert_eq!(
            PageCategory::from_url("https://a.com/team"),
            PageCategory::Team
        );
        assert_eq!(
            PageCategory::from_url("https://a.com/services"),
            PageCategory::Products
        );
        assert_eq!(
            PageCategory::from_url("https://a.com/contact-us"),
            PageCategory::Contact
        );
        assert_eq!(
            PageCategory::from_url("https://a.com/history"),
            PageCategory::Other
        );
        assert_eq!(PageCategory::Other.label(), "Company page");
    }

    #[test]
    fn test_category_from_label() {
        assert_eq!(PageCategory::from_label("careers page"), PageCategory::Careers);
        assert_eq!(PageCategory::from_label("Products page"), PageCategory::Products);
        assert_eq!(PageCategory::from_label("blog"), PageCategory::Other);
    }

    #[test]
    fn test_combine_labels_secondary_pages() {
        let primary = page("https://acme.com", "Acme", "Welcome to Acme.");
        let careers = page("https://acme.com/careers", "Jobs", "Join us.");

        let combined = combine(&primary, &[careers], 10_000);

        assert!(combined.starts_with(
            "Landing page:\nWebpage Title:\nAcme\nWebpage Contents:\nWelcome to Acme.\n\n"
        ));
        let label_pos = combined.find("Careers page:\n").unwrap();
        let content_pos = combined
            .find("Webpage Title:\nJobs\nWebpage Contents:\nJoin us.")
            .unwrap();
        assert_eq!(label_pos + "Careers page:\n".len(), content_pos);
    }

    #[test]
    fn test_combine_keeps_secondary_order() {
        let primary = page("https://acme.com", "Acme", "Home");
        let team = page("https://acme.com/team", "Team", "People");
        let about = page("https://acme.com/about", "About", "Story");

        let combined = combine(&primary, &[team, about], 10_000);

        assert!(combined.find("Team page:").unwrap() < combined.find("About page:").unwrap());
    }

    #[test]
    fn test_combine_truncates() {
        let primary = page("https://acme.com", "Acme", &"word ".repeat(500));
        let combined = combine(&primary, &[], 100);
        assert!(combined.chars().count() <= 100 + crate::text::ELLIPSIS.len());
    }
}
