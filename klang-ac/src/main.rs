//! klang-ac - Audio Classification Microservice
//!
//! Accepts an audio resource URL, downloads and decodes it, classifies it
//! into the four-class taxonomy (music / speech / noise / silence), and
//! memoizes the result per source URL in Redis.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use klang_ac::config::{ClassifierKind, ServiceConfig};
use klang_ac::services::{
    AnalysisPipeline, AudioFetcher, ClassifierStrategy, ModelClassifier, OnnxTagger, RedisStore,
};
use klang_ac::workers::CpuPool;
use klang_ac::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting klang-ac (Audio Classification) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::from_env()?;

    // The tagger model loads once; a failure here aborts startup rather
    // than being retried per request
    let classifier = match config.classifier {
        ClassifierKind::Heuristic => {
            info!("Classifier strategy: heuristic (signal statistics)");
            ClassifierStrategy::Heuristic
        }
        ClassifierKind::Model => {
            let model_dir = config
                .model_dir
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("KLANG_MODEL_DIR is not set"))?;
            info!(dir = %model_dir.display(), "Classifier strategy: model");
            let tagger = OnnxTagger::load(model_dir)?;
            ClassifierStrategy::Model(Arc::new(ModelClassifier::new(Arc::new(tagger))))
        }
    };

    let store = RedisStore::connect(&config.redis_url).await?;
    let fetcher = AudioFetcher::new(config.download_timeout)?;
    let cpu = CpuPool::new(config.cpu_workers);

    let pipeline = AnalysisPipeline::new(
        fetcher,
        Arc::new(store),
        classifier,
        cpu,
        config.cache_ttl,
    );

    let state = AppState::new(Arc::new(pipeline));
    let app = klang_ac::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("Listening on http://{}", config.bind_addr());
    info!("Health check: http://{}/health", config.bind_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
