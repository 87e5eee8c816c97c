//! Configuration resolution for klang-ac
//!
//! The whole surface is environment-driven (`KLANG_*` variables) with
//! compiled defaults. Values that must be coherent to serve traffic at
//! all (classifier strategy, model directory) fail startup instead of
//! degrading.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use klang_common::config::{env_opt, env_parse, env_string};
use klang_common::{Error, Result};

/// Which classifier the pipeline uses on cache misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Pretrained tagger (requires `KLANG_MODEL_DIR`)
    Model,
    /// Signal-statistics rules, no model dependency
    Heuristic,
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "model" => Ok(ClassifierKind::Model),
            "heuristic" => Ok(ClassifierKind::Heuristic),
            other => Err(format!(
                "expected \"model\" or \"heuristic\", got {:?}",
                other
            )),
        }
    }
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Redis connection URL (including the logical database index)
    pub redis_url: String,
    /// Cached result lifetime
    pub cache_ttl: Duration,
    /// Classification strategy
    pub classifier: ClassifierKind,
    /// Directory holding `tagger.onnx` + `labels.txt`
    pub model_dir: Option<PathBuf>,
    /// Total download timeout per request
    pub download_timeout: Duration,
    /// Concurrent CPU-bound jobs
    pub cpu_workers: usize,
}

impl ServiceConfig {
    /// Resolve the configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let host = env_string("KLANG_HOST", "0.0.0.0");
        let port = env_parse("KLANG_PORT", 8000u16);

        // KLANG_REDIS_URL overrides the host/port/db triple
        let redis_url = env_opt("KLANG_REDIS_URL").unwrap_or_else(|| {
            let redis_host = env_string("KLANG_REDIS_HOST", "localhost");
            let redis_port = env_parse("KLANG_REDIS_PORT", 6379u16);
            let redis_db = env_parse("KLANG_REDIS_DB", 0u32);
            format!("redis://{}:{}/{}", redis_host, redis_port, redis_db)
        });

        let cache_ttl = Duration::from_secs(env_parse("KLANG_CACHE_TTL_SECS", 3600u64));
        let download_timeout =
            Duration::from_secs(env_parse("KLANG_DOWNLOAD_TIMEOUT_SECS", 30u64));
        let cpu_workers = env_parse("KLANG_CPU_WORKERS", num_cpus::get());

        let classifier = env_string("KLANG_CLASSIFIER", "model")
            .parse::<ClassifierKind>()
            .map_err(|e| Error::Config(format!("KLANG_CLASSIFIER: {}", e)))?;

        let model_dir = env_opt("KLANG_MODEL_DIR").map(PathBuf::from);
        if classifier == ClassifierKind::Model && model_dir.is_none() {
            return Err(Error::Config(
                "KLANG_MODEL_DIR must be set when KLANG_CLASSIFIER=model \
                 (directory containing tagger.onnx and labels.txt)"
                    .to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            redis_url,
            cache_ttl,
            classifier,
            model_dir,
            download_timeout,
            cpu_workers,
        })
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
