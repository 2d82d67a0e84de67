//! Fixed prompt text sent to the models.

use super::Message;
use crate::language::Language;

pub const LINK_EXTRACTION_SYSTEM_PROMPT: &str = r#"You are provided with a list of links found on a webpage.
You are able to decide which of the links would be most relevant to include in a brochure about the company,
such as links to an About page, or a Company page, or Careers/Jobs pages.

You should respond in JSON as in this example:
{
    "links": [
        {"type": "about page", "url": "https://full.url/goes/here/about"},
        {"type": "careers page", "url": "https://another.full.url/careers"}
    ]
}"#;

pub const BROCHURE_GENERATION_SYSTEM_PROMPT: &str = "You are an assistant that analyzes the contents of several relevant pages from a company website
and creates a short brochure about the company for prospective customers, investors and recruits. Respond in markdown.
Include details of company culture, customers and careers/jobs if you have the information.";

pub const CONNECTION_TEST_PROMPT: &str =
    "Hello, this is a connection test. Please respond with 'OK'.";

const LINK_EXAMPLE_USER: &str = "Here is the list of links on the website of https://example-company.com - please decide which of these are relevant web links for a brochure about the company, respond with the full https URL in JSON format. Do not include Terms of Service, Privacy, email links.
Links (some might be relative links):
/about
/team
/careers
/contact
/privacy-policy
/terms
/products
mailto:info@example.com";

const LINK_EXAMPLE_ASSISTANT: &str = r#"{
    "links": [
        {"type": "about page", "url": "https://example-company.com/about"},
        {"type": "team page", "url": "https://example-company.com/team"},
        {"type": "careers page", "url": "https://example-company.com/careers"},
        {"type": "products page", "url": "https://example-company.com/products"}
    ]
}"#;

const BROCHURE_EXAMPLE_USER: &str = "You are looking at a company called: TechCorp
Here are the contents of its landing page and other relevant pages; use this information to build a short brochure of the company in markdown.

Landing page:
Webpage Title: TechCorp - Innovative Software Solutions
Webpage Contents:
TechCorp is a leading software development company specializing in enterprise solutions.
We help businesses transform their operations through cutting-edge technology.
Founded in 2015, we have served over 500 clients worldwide.

About page:
Webpage Title: About TechCorp
Webpage Contents:
Our mission is to democratize technology for businesses of all sizes.
We believe in innovation, collaboration, and excellence.
Our team of 100+ engineers works remotely across 15 countries.";

const BROCHURE_EXAMPLE_ASSISTANT: &str = "# TechCorp - Innovative Software Solutions

## About Us
TechCorp is a leading software development company that has been transforming businesses through cutting-edge technology since 2015. We specialize in enterprise solutions that help organizations of all sizes leverage the power of modern technology.

## Our Mission
To democratize technology for businesses worldwide, making innovative solutions accessible and practical for companies of every scale.

## Company Culture
- **Innovation**: We push the boundaries of what's possible
- **Collaboration**: Our global team works together seamlessly
- **Excellence**: We deliver nothing but the highest quality solutions

## Our Team
100+ talented engineers working remotely across 15 countries, bringing diverse perspectives and expertise to every project.

## Track Record
✅ **500+ satisfied clients** worldwide
✅ **8+ years** of proven experience
✅ **Global presence** across multiple continents

*Ready to transform your business? Let's build the future together.*";

pub fn link_extraction_examples() -> [Message; 2] {
    [
        Message::user(LINK_EXAMPLE_USER),
        Message::assistant(LINK_EXAMPLE_ASSISTANT),
    ]
}

pub fn brochure_generation_examples() -> [Message; 2] {
    [
        Message::user(BROCHURE_EXAMPLE_USER),
        Message::assistant(BROCHURE_EXAMPLE_ASSISTANT),
    ]
}

pub fn link_extraction_prompt(website_url: &str, links: &[String]) -> String {
    format!(
        "Here is the list of links on the website of {website_url} - please decide which of these are relevant web links for a brochure about the company, respond with the full https URL in JSON format. Do not include Terms of Service, Privacy, email links.\nLinks (some might be relative links):\n{}",
        links.join("\n")
    )
}

pub fn brochure_generation_prompt(company_name: &str, content: &str, language: Language) -> String {
    format!(
        "You are looking at a company called: {company_name}\nHere are the contents of its landing page and other relevant pages; use this information to build a short brochure of the company in markdown.\n{content}{}",
        language.prompt_suffix()
    )
}

/// Example pairs (when enabled) followed by the user prompt.
pub fn with_examples(user_prompt: String, examples: [Message; 2], use_few_shot: bool) -> Vec<Message> {
    let mut messages = Vec::with_capacity(3);
    if use_few_shot {
        messages.extend(examples);
    }
    messages.push(Message::user(user_prompt));
    messages
}
