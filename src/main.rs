use anyhow::Result;
use std::io::BufRead;
use std::sync::Arc;
use tracing::info;
use ui_translation_cache::{
    Config, HttpTranslationProvider, LanguageContext, LanguageTag, MemoryCacheGateway,
    PersistentCacheGateway, PgCacheGateway, TranslationProvider,
};

/// Demo driver: reads UI strings from stdin (one per line), runs two
/// simulated rendering passes with a settle in between, and prints what a
/// component would display before and after dispatch.
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ui_translation_cache=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let source_language = LanguageTag::new(config.source_language.clone())?;
    let target: LanguageTag = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "es".to_string())
        .parse()?;

    info!("Starting translation cache demo ({} -> {})", source_language, target);

    let gateway: Arc<dyn PersistentCacheGateway> = match &config.database_url {
        Some(url) => {
            info!("Using shared PostgreSQL cache");
            Arc::new(PgCacheGateway::connect(url).await?)
        }
        None => {
            info!("DATABASE_URL not set; using in-process cache");
            Arc::new(MemoryCacheGateway::new())
        }
    };

    let provider: Option<Arc<dyn TranslationProvider>> =
        match HttpTranslationProvider::from_config(&config)? {
            Some(provider) => Some(Arc::new(provider)),
            None => {
                info!("No translation provider configured; running degraded");
                None
            }
        };

    let context = LanguageContext::new(source_language, gateway, provider);
    context.set_language(target);

    let strings: Vec<String> = std::io::stdin()
        .lock()
        .lines()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();

    // First rendering pass: everything falls back to the source string.
    info!("Rendering pass 1 ({} strings)", strings.len());
    for source in &strings {
        context.register(source);
        println!("  {}", context.lookup(source));
    }

    let report = context.settle().await;
    info!(
        "Settled: {} from cache, {} from provider, {} unresolved",
        report.from_cache, report.from_provider, report.unresolved
    );

    // Second rendering pass: resolved strings now display translated.
    info!("Rendering pass 2");
    for source in &strings {
        context.register(source);
        println!("  {}", context.lookup(source));
    }

    println!("{}", serde_json::to_string_pretty(&context.stats())?);
    Ok(())
}
