//! Service modules for the classification pipeline

pub mod cache;
pub mod extractor;
pub mod fetcher;
pub mod heuristic;
pub mod model;
pub mod pipeline;
pub mod tagger;
pub mod taxonomy;

pub use cache::{cache_key, ClassificationStore, MemoryStore, RedisStore};
pub use extractor::{extract_features, WaveformPair, TAGGER_SAMPLE_RATE};
pub use fetcher::{AudioFetcher, FetchedAudio};
pub use heuristic::SignalStats;
pub use model::ModelClassifier;
pub use pipeline::{AnalysisPipeline, ClassifierStrategy};
pub use tagger::{OnnxTagger, Tagger};
pub use taxonomy::{TaxonomyMap, BUCKET_ORDER};
