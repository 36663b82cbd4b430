//! Translate binary - renders strings through the client-side pipeline
//!
//! Usage:
//!   cargo run --bin translate -- Bonjour Contact          # Use the stored locale
//!   cargo run --bin translate -- --locale he Bonjour      # Switch locale first
//!
//! Optional environment variables:
//! - TRANSLATE_API_URL (defaults to http://localhost:8080)
//! - COALESCE_WINDOW_MS (defaults to 10)
//! - LOCALE_PREFERENCE_FILE (defaults to .site-translator/locale.json)

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use site_translator::cache::TranslationCache;
use site_translator::client::{ClientTranslator, HttpTranslateClient, LocalizedText};
use site_translator::coalescer::RequestCoalescer;
use site_translator::config::ClientConfig;
use site_translator::context::{DocumentState, FilePreferenceStore, LocaleContext};
use std::sync::Arc;
use tracing::info;

struct Args {
    locale: Option<String>,
    texts: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut locale = None;
    let mut texts = Vec::new();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--locale" | "-l" => {
                locale = Some(args.next().context("--locale requires a value")?);
            }
            _ => texts.push(arg),
        }
    }

    Ok(Args { locale, texts })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_translator=info".parse()?),
        )
        .init();

    let args = parse_args()?;
    let config = ClientConfig::from_env()?;

    let document = Arc::new(DocumentState::new());
    let context = Arc::new(LocaleContext::new(
        Arc::new(FilePreferenceStore::new(config.preference_file.clone())),
        document.clone(),
    ));
    context.initialize();

    if let Some(code) = &args.locale {
        context.change_locale(code)?;
    }

    if args.texts.is_empty() {
        if args.locale.is_none() {
            bail!("Nothing to translate. Usage: translate [--locale <code>] <text>...");
        }
        println!("{}", context.active());
        return Ok(());
    }

    let backend = Arc::new(HttpTranslateClient::from_config(&config)?);
    let coalescer = RequestCoalescer::new(
        backend,
        Arc::new(TranslationCache::in_memory()),
        config.coalesce_window,
    );
    let translator = ClientTranslator::new(context.clone(), coalescer);

    let mut texts: Vec<LocalizedText> = args.texts.into_iter().map(LocalizedText::new).collect();
    join_all(texts.iter_mut().map(|text| text.refresh(&translator))).await;
    translator.shutdown().await;

    if let Some(attributes) = document.current() {
        info!(lang = %attributes.lang, dir = %attributes.dir, "Document attributes");
    }

    println!("lang={} dir={}", context.active(), context.direction());
    for text in &texts {
        println!("{}\t{}", text.source(), text.display());
    }

    Ok(())
}
