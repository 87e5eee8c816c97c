//! Pipeline-level integration tests
//!
//! Exercises the orchestrator directly: strategy selection, cache
//! lifecycle, and single-flight coalescing of concurrent same-key
//! requests.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use common::{heuristic_pipeline, spawn_fixture_server, tone_wav};
use klang_ac::models::{ClassificationResult, TaxonomyLabel};
use klang_ac::services::{
    AnalysisPipeline, AudioFetcher, ClassificationStore, ClassifierStrategy, MemoryStore,
    ModelClassifier, Tagger,
};
use klang_ac::workers::CpuPool;
use klang_common::Result;

/// Store wrapper counting writes, to observe recomputation.
struct CountingStore {
    inner: MemoryStore,
    puts: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            puts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ClassificationStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<ClassificationResult>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, result: &ClassificationResult, ttl: Duration) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, result, ttl).await
    }
}

/// Tagger stub emitting fixed logits regardless of the waveform.
struct FixedTagger {
    labels: Vec<String>,
    logits: Vec<f32>,
}

impl Tagger for FixedTagger {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn infer(&self, _waveform: &[f32]) -> Result<Vec<f32>> {
        Ok(self.logits.clone())
    }
}

fn model_pipeline(
    store: Arc<dyn ClassificationStore>,
    labels: &[&str],
    logits: &[f32],
) -> AnalysisPipeline {
    let tagger = Arc::new(FixedTagger {
        labels: labels.iter().map(|s| s.to_string()).collect(),
        logits: logits.to_vec(),
    });
    AnalysisPipeline::new(
        AudioFetcher::new(Duration::from_secs(10)).unwrap(),
        store,
        ClassifierStrategy::Model(Arc::new(ModelClassifier::new(tagger))),
        CpuPool::new(2),
        Duration::from_secs(3600),
    )
}

#[tokio::test]
async fn test_model_strategy_classifies_via_tagger() {
    let server = spawn_fixture_server(tone_wav(440.0, 0.5, 44100, 1, 1.0), "audio/wav").await;
    let store = Arc::new(MemoryStore::new());

    // Dominant logit on a music label: the tone must come back as music
    // even though the heuristic would call it speech.
    let pipeline = model_pipeline(
        store,
        &["Speech", "Violin, fiddle", "Siren"],
        &[0.1, 5.0, 0.2],
    );

    let result = pipeline.analyze(&server.clip_url()).await.unwrap();
    assert_eq!(result.classification, TaxonomyLabel::Music);
    assert_eq!(result.features.sample_rate, 44100);
    assert_eq!(result.features.channels, 1);
}

#[tokio::test]
async fn test_concurrent_requests_compute_once() {
    let server = spawn_fixture_server(tone_wav(440.0, 0.5, 22050, 1, 1.0), "audio/wav").await;
    let store = Arc::new(CountingStore::new());
    let pipeline = Arc::new(heuristic_pipeline(store.clone(), Duration::from_secs(3600)));
    let url = server.clip_url();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let pipeline = pipeline.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move { pipeline.analyze(&url).await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    for result in &results {
        assert_eq!(result.classification, TaxonomyLabel::Speech);
        assert_eq!(result, &results[0]);
    }

    // Single-flight: one computation, one cache write; every request
    // still performs its own retrieval.
    assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    assert_eq!(server.hits(), 5);
}

#[tokio::test]
async fn test_expired_entry_recomputes() {
    let server = spawn_fixture_server(tone_wav(440.0, 0.5, 22050, 1, 1.0), "audio/wav").await;
    let store = Arc::new(CountingStore::new());
    let pipeline = heuristic_pipeline(store.clone(), Duration::from_millis(40));
    let url = server.clip_url();

    pipeline.analyze(&url).await.unwrap();
    assert_eq!(store.puts.load(Ordering::SeqCst), 1);

    // Within the TTL: served from cache, no second write
    pipeline.analyze(&url).await.unwrap();
    assert_eq!(store.puts.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(80)).await;

    // Past the TTL: the entry is a miss and the result is recomputed
    pipeline.analyze(&url).await.unwrap();
    assert_eq!(store.puts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_classification_failure_reaches_caller() {
    struct BrokenTagger {
        labels: Vec<String>,
    }
    impl Tagger for BrokenTagger {
        fn labels(&self) -> &[String] {
            &self.labels
        }
        fn infer(&self, _waveform: &[f32]) -> Result<Vec<f32>> {
            Err(klang_common::Error::Internal(
                "inference backend gone".to_string(),
            ))
        }
    }

    let server = spawn_fixture_server(tone_wav(440.0, 0.5, 22050, 1, 1.0), "audio/wav").await;
    let store = Arc::new(CountingStore::new());
    let pipeline = AnalysisPipeline::new(
        AudioFetcher::new(Duration::from_secs(10)).unwrap(),
        store.clone(),
        ClassifierStrategy::Model(Arc::new(ModelClassifier::new(Arc::new(BrokenTagger {
            labels: vec!["Speech".to_string()],
        })))),
        CpuPool::new(2),
        Duration::from_secs(3600),
    );

    let err = pipeline.analyze(&server.clip_url()).await.unwrap_err();
    assert!(matches!(err, klang_common::Error::Internal(_)));
    // Nothing is cached on failure
    assert_eq!(store.puts.load(Ordering::SeqCst), 0);

    // The pipeline stays usable for the next request
    let err = pipeline.analyze(&server.clip_url()).await.unwrap_err();
    assert!(matches!(err, klang_common::Error::Internal(_)));
}
