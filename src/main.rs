//! `brochure` command-line interface.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::error;
use tracing_subscriber::EnvFilter;

use brochure::config::{Config, ProviderKind};
use brochure::providers::{LanguageModel, ProviderClient};
use brochure::storage::{FileStore, Persistence};
use brochure::{BrochureGenerator, GenerationEvent, GenerationRequest, GenerationResult, Language};

/// Generate company brochures from their websites
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// AI provider: "openai" or "claude"
    #[arg(long, short, global = true, default_value = "openai")]
    provider: ProviderKind,

    /// Model name overriding the provider default
    #[arg(long, short, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a company website and generate a brochure
    Generate {
        /// Company name used in the prompt and the output filename
        company_name: String,
        /// Landing page URL (http:// or https://)
        website_url: String,
        /// Brochure language code
        #[arg(long, short, default_value = "en")]
        language: Language,
        /// Print the brochure as it is generated
        #[arg(long)]
        stream: bool,
        /// Send the prompts without few-shot examples
        #[arg(long)]
        no_few_shot: bool,
        /// Do not write the metadata JSON file
        #[arg(long)]
        no_metadata: bool,
        /// Character budget for the scraped content
        #[arg(long)]
        max_content_length: Option<usize>,
    },
    /// List supported brochure languages
    Languages,
    /// Delete generated files older than the given number of days
    Cleanup {
        #[arg(long, short, default_value_t = 30)]
        days: u32,
    },
    /// Check that the provider API is reachable with the configured key
    Test,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli, config).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    match cli.command {
        Command::Generate {
            company_name,
            website_url,
            language,
            stream,
            no_few_shot,
            no_metadata,
            max_content_length,
        } => {
            let generator = BrochureGenerator::from_config(&config, cli.provider, cli.model.as_deref())
                .context("Failed to initialize brochure generator")?;

            let request = GenerationRequest::new(company_name, website_url)
                .with_language(language)
                .with_few_shot(!no_few_shot)
                .with_streaming(stream)
                .with_metadata(!no_metadata)
                .with_max_content_length(
                    max_content_length.unwrap_or(config.max_content_length()),
                );

            let result = if stream {
                stream_to_stdout(&generator, &request).await?
            } else {
                let result = generator.generate(&request).await?;
                println!("{}", result.content);
                result
            };
            print_summary(&result);
        }
        Command::Languages => {
            for language in Language::ALL {
                println!("{:<4} {}", language.code(), language.display_name());
            }
        }
        Command::Cleanup { days } => {
            let store = FileStore::new(config.output_dir())?;
            let removed = store.cleanup_older_than(Some(days))?;
            println!("Removed {removed} file(s) older than {days} day(s)");
        }
        Command::Test => {
            let client = ProviderClient::from_config(&config, cli.provider, cli.model.as_deref())?;
            let info = client.model_info();
            println!("{}", serde_json::to_string_pretty(&info)?);

            if !client.test_connection().await {
                println!("Connection test failed");
                return Ok(ExitCode::FAILURE);
            }
            println!("Connection test passed");
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn stream_to_stdout(
    generator: &BrochureGenerator,
    request: &GenerationRequest,
) -> Result<GenerationResult> {
    let mut events = generator.stream(request).await?;
    let mut stdout = io::stdout();

    while let Some(event) = events.next().await {
        match event? {
            GenerationEvent::Fragment(fragment) => {
                write!(stdout, "{fragment}")?;
                stdout.flush()?;
            }
            GenerationEvent::Completed(result) => {
                writeln!(stdout)?;
                return Ok(*result);
            }
        }
    }

    anyhow::bail!("stream ended before the brochure was complete")
}

fn print_summary(result: &GenerationResult) {
    let saved = result
        .file_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "not saved".to_string());
    eprintln!(
        "Saved: {saved} ({} words, {:.1}s)",
        result.word_count, result.elapsed_seconds
    );
}
