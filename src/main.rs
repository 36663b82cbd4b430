use anyhow::{Context, Result};
use site_translator::api::{self, AppState};
use site_translator::cache::TranslationCache;
use site_translator::config::Config;
use site_translator::db::PgTranslationStore;
use site_translator::provider::OpenAiProvider;
use site_translator::resolver::Translator;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_translator=info".parse()?),
        )
        .init();

    info!("Starting translation server");

    let config = Config::from_env()?;

    let cache = match &config.database_url {
        Some(url) => {
            let store = PgTranslationStore::connect(url).await?;
            info!("Using PostgreSQL-backed translation cache");
            TranslationCache::with_store(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, translations are cached in memory only");
            TranslationCache::in_memory()
        }
    };

    let http = reqwest::Client::builder()
        .timeout(config.attempt_timeout())
        .build()
        .context("Failed to build HTTP client")?;
    let provider = OpenAiProvider::new(http, &config);

    let translator = Arc::new(
        Translator::new(Arc::new(cache), Arc::new(provider)).with_timeout(config.provider_timeout),
    );

    let app = api::router(AppState::new(translator.clone(), config.api_key.clone()));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    translator.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
