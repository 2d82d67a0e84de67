//! Generates marketing brochures for companies from their public websites.
//!
//! The landing page is scraped, a language model picks the secondary pages
//! worth reading, and the assembled text is turned into a markdown brochure
//! by OpenAI or Anthropic models. See [`generator::BrochureGenerator`].

pub mod assembler;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod generator;
pub mod language;
pub mod links;
pub mod providers;
pub mod retry;
pub mod scraping;
pub mod storage;
pub mod text;

pub use error::BrochureError;
pub use generator::{
    BrochureGenerator, GenerationEvent, GenerationRequest, GenerationResult, GenerationStream,
};
pub use language::Language;
