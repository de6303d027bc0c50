use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use varnantar::config::Config;
use varnantar::glossary::GlossaryStore;
use varnantar::google::GoogleTranslateClient;
use varnantar::handler::RequestHandler;
use varnantar::openai::{OpenAiClient, OpenAiSettings};
use varnantar::replacer::Replacer;
use varnantar::server::{create_router, AppState};
use varnantar::translation::Translator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when variables come from the environment)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("varnantar=info".parse()?),
        )
        .init();

    info!("Starting translation service");

    let config = Arc::new(Config::from_env()?);
    info!("Environment: {}", config.environment);

    if config.api_key.is_none() {
        if config.is_production() {
            warn!("API_KEY is not set; glossary reload is disabled in production");
        } else {
            info!("API_KEY is not set; glossary reload is disabled");
        }
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let glossary = Arc::new(GlossaryStore::new(&config.glossary_dir));
    info!("Glossary directory: {}", glossary.root().display());

    let translator = Translator::new(
        Arc::new(GoogleTranslateClient::new(
            http.clone(),
            config.google_translate_url.clone(),
        )),
        Replacer::new(Arc::clone(&glossary)),
    );
    let openai = Arc::new(OpenAiClient::new(http, OpenAiSettings::from(config.as_ref())));
    let handler = RequestHandler::new(translator, openai.clone(), openai);

    let state = AppState {
        config: Arc::clone(&config),
        handler,
        glossary,
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    info!("Endpoints:");
    info!("  GET  /health");
    info!("  GET  /api/languages");
    info!("  POST /api/translate");
    info!("  POST /api/translate/features");
    info!("  POST /api/summarize | /api/bulletins | /api/questions | /api/chat");
    info!("  POST /api/speech-to-text | /api/text-to-speech");
    info!("  POST /admin/glossary/reload");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
