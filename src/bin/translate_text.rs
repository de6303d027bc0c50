//! One-shot translation from the command line, with glossary layers applied.
//!
//! Usage:
//!   cargo run --bin translate -- <source> <target> [text...]
//!   echo "Hello" | cargo run --bin translate -- en gu
//!   cargo run --bin translate -- --pure en gu Hello    # skip glossary layers
//!
//! Optional environment variables:
//! - GLOSSARY_DIR (defaults to data/glossary)
//! - GOOGLE_TRANSLATE_URL (defaults to the public translate_a/single endpoint)
//! - REQUEST_TIMEOUT_SECS (defaults to 60)

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use varnantar::glossary::GlossaryStore;
use varnantar::google::GoogleTranslateClient;
use varnantar::i18n::Language;
use varnantar::replacer::Replacer;
use varnantar::translation::{Layers, TranslationRequest, Translator};

/// Minimal config for the CLI (no OpenAI key required)
struct CliConfig {
    glossary_dir: String,
    google_translate_url: String,
    request_timeout_secs: u64,
}

impl CliConfig {
    fn from_env() -> Self {
        Self {
            glossary_dir: std::env::var("GLOSSARY_DIR")
                .unwrap_or_else(|_| "data/glossary".to_string()),
            google_translate_url: std::env::var("GOOGLE_TRANSLATE_URL").unwrap_or_else(|_| {
                "https://translate.googleapis.com/translate_a/single".to_string()
            }),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("varnantar=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let pure = args.iter().any(|a| a == "--pure");
    args.retain(|a| a != "--pure");

    if args.len() < 2 {
        bail!("Usage: translate [--pure] <source> <target> [text...]");
    }

    let source = Language::from_code(&args[0])?;
    let target = Language::target_from_code(&args[1])?;

    let text = if args.len() > 2 {
        args[2..].join(" ")
    } else {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read text from stdin")?;
        buffer
    };

    let config = CliConfig::from_env();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let store = Arc::new(GlossaryStore::new(&config.glossary_dir));
    let translator = Translator::new(
        Arc::new(GoogleTranslateClient::new(http, config.google_translate_url)),
        Replacer::new(store),
    );

    info!(
        "Translating {} -> {} (glossary layers: {})",
        source.code(),
        target.code(),
        !pure
    );

    let result = translator
        .translate(TranslationRequest::new(
            text,
            source,
            target,
            Layers::uniform(!pure),
        ))
        .await
        .context("Translation failed")?;

    println!("{}", result.result);

    if !result.changes.post_replacer.is_empty() {
        eprintln!();
        eprintln!("Post-replacer changes:");
        eprintln!("{}", serde_json::to_string_pretty(&result.changes)?);
    }

    Ok(())
}
