use serde::{Deserialize, Serialize};

/// Title, visible text and outbound links of one scraped page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub body: String,
    pub outbound_links: Vec<String>,
}

impl PageContent {
    /// Block layout used when the page is placed into the prompt document.
    pub fn formatted(&self) -> String {
        format!(
            "Webpage Title:\n{}\nWebpage Contents:\n{}\n\n",
            self.title, self.body
        )
    }
}
