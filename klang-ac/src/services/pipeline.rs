//! Classification pipeline
//!
//! Sequences one request end to end: retrieve → cache lookup → extract →
//! classify → cache write. Collaborator failures are mapped to the error
//! taxonomy at this boundary, and the downloaded temp file is owned here
//! for the request duration so it is deleted on every exit path,
//! including cache-hit short-circuits and classification failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::ClassificationResult;
use crate::services::cache::{cache_key, ClassificationStore};
use crate::services::extractor::extract_features;
use crate::services::fetcher::AudioFetcher;
use crate::services::heuristic;
use crate::services::model::ModelClassifier;
use crate::workers::CpuPool;
use klang_common::Result;

/// Which classification strategy the pipeline runs on a cache miss.
pub enum ClassifierStrategy {
    /// Pretrained tagger over the tagger-rate waveform
    Model(Arc<ModelClassifier>),
    /// Signal-statistics rules over the native-rate waveform
    Heuristic,
}

/// Per-key computation guards: at most one in-flight classification per
/// cache key, concurrent requests for the same key await it and then hit
/// the cache.
#[derive(Default)]
struct SingleFlight {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    async fn acquire(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the key's guard entry once no other request holds it.
    async fn evict(&self, key: &str) {
        let mut locks = self.locks.lock().await;
        if let Some(lock) = locks.get(key) {
            // One reference in the map means no waiter holds a clone
            if Arc::strong_count(lock) == 1 {
                locks.remove(key);
            }
        }
    }
}

/// The orchestrator: owns the collaborators and the strategy.
pub struct AnalysisPipeline {
    fetcher: AudioFetcher,
    store: Arc<dyn ClassificationStore>,
    classifier: ClassifierStrategy,
    cpu: CpuPool,
    cache_ttl: Duration,
    inflight: SingleFlight,
}

impl AnalysisPipeline {
    pub fn new(
        fetcher: AudioFetcher,
        store: Arc<dyn ClassificationStore>,
        classifier: ClassifierStrategy,
        cpu: CpuPool,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            classifier,
            cpu,
            cache_ttl,
            inflight: SingleFlight::default(),
        }
    }

    /// Classify the resource behind `url`, serving repeats from the cache.
    pub async fn analyze(&self, url: &str) -> Result<ClassificationResult> {
        // `fetched` lives until return; dropping it deletes the temp file
        let fetched = self.fetcher.fetch(url).await?;

        let key = cache_key(url);
        if let Some(hit) = self.store.get(&key).await? {
            info!(url, "Serving classification from cache");
            return Ok(hit);
        }

        let guard = self.inflight.acquire(&key).await;

        // A concurrent request may have filled the cache while we waited.
        // The cache write happens under the guard so waiters always find
        // the entry on this re-check.
        let outcome = match self.store.get(&key).await {
            Ok(Some(hit)) => {
                debug!(url, "Cache filled while awaiting in-flight computation");
                Ok(hit)
            }
            Ok(None) => match self.compute(fetched.path(), url).await {
                Ok(result) => self
                    .store
                    .put(&key, &result, self.cache_ttl)
                    .await
                    .map(|_| result),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        drop(guard);
        self.inflight.evict(&key).await;

        outcome
    }

    async fn compute(&self, path: &std::path::Path, url: &str) -> Result<ClassificationResult> {
        let audio_path = path.to_path_buf();
        let (features, waveforms) = self
            .cpu
            .run(move || extract_features(&audio_path))
            .await?;

        let classification = match &self.classifier {
            ClassifierStrategy::Model(classifier) => {
                let classifier = classifier.clone();
                let waveform = waveforms.tagger;
                self.cpu
                    .run(move || classifier.classify(&waveform))
                    .await?
            }
            ClassifierStrategy::Heuristic => {
                let waveform = waveforms.native;
                let rate = waveforms.native_rate;
                self.cpu
                    .run(move || Ok(heuristic::classify(&waveform, rate)))
                    .await?
            }
        };

        info!(url, classification = %classification, "Audio classified");

        Ok(ClassificationResult {
            features,
            classification,
        })
    }
}
