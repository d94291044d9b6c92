use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use shopcrawl::api::ApiState;
use shopcrawl::extract::{DomainPatternExtractor, Extractor, HttpModelClient, ModelExtractor, ParserKind, PatternExtractor};
use shopcrawl::storage::InMemoryStorage;
use shopcrawl::{CrawlEngine, CrawlerConfig, Fetcher};

fn port_from_env() -> Option<u16> {
    for k in ["SHOPCRAWL_PORT", "PORT"] {
        if let Ok(v) = env::var(k) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

/// Build the extractor pipeline in the order `CrawlerConfig::parsers_to_use`
/// names. The model extractor is only included when a provider endpoint and
/// key are configured; its absence is not an error — it's the same
/// graceful-degradation pattern this codebase uses for every optional
/// external integration.
fn build_extractors(config: &CrawlerConfig) -> Vec<Arc<dyn Extractor>> {
    let mut extractors: Vec<Arc<dyn Extractor>> = Vec::new();
    for kind in &config.parsers_to_use {
        match kind {
            ParserKind::Simple => extractors.push(Arc::new(PatternExtractor::new())),
            ParserKind::Config => extractors.push(Arc::new(DomainPatternExtractor::default())),
            ParserKind::Ai => match (env::var("MODEL_API_URL"), env::var("MODEL_API_KEY")) {
                (Ok(endpoint), Ok(api_key)) => {
                    let model = env::var("MODEL_NAME").unwrap_or_else(|_| "gpt-4o-mini".to_string());
                    let client = HttpModelClient::new(endpoint, api_key, model);
                    extractors.push(Arc::new(ModelExtractor::new(Arc::new(client))));
                }
                _ => warn!(
                    "MODEL_API_URL/MODEL_API_KEY not set; skipping the model-based (AI) extractor"
                ),
            },
        }
    }
    extractors
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting crawl engine server");

    let config = CrawlerConfig::from_env();
    let fetcher = Fetcher::new(config.crawl_delay, config.max_retries, config.timeout);
    let extractors = build_extractors(&config);
    if extractors.is_empty() {
        warn!("no extractors configured; every page will yield zero product URLs");
    }
    let storage = Arc::new(InMemoryStorage::new(config.fast_store_ttl));
    let engine = Arc::new(CrawlEngine::new(config, fetcher, extractors, storage.clone()));

    let state = Arc::new(ApiState::new(engine, storage));
    let app = shopcrawl::api::build_router(state);

    let port = port_from_env().unwrap_or(5000);
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {bind_addr}. Stop the existing process or set PORT/SHOPCRAWL_PORT."
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("Control API listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
