//! Model-based classifier
//!
//! Runs the pretrained tagger once over the tagger-rate waveform, turns
//! the logits into a probability distribution, folds per-label
//! probabilities into the four taxonomy buckets through the `TaxonomyMap`,
//! and picks the best bucket.

use std::sync::Arc;

use tracing::debug;

use crate::models::TaxonomyLabel;
use crate::services::tagger::Tagger;
use crate::services::taxonomy::{TaxonomyMap, BUCKET_ORDER};
use klang_common::Result;

/// Classifier over a shared, read-only tagger and taxonomy map.
///
/// Built once at startup; `classify` is safe to call from any number of
/// concurrent requests.
pub struct ModelClassifier {
    tagger: Arc<dyn Tagger>,
    map: TaxonomyMap,
}

impl ModelClassifier {
    pub fn new(tagger: Arc<dyn Tagger>) -> Self {
        let map = TaxonomyMap::build(tagger.labels());
        debug!(
            vocabulary = tagger.labels().len(),
            mapped = map.len(),
            "Taxonomy map built"
        );
        Self { tagger, map }
    }

    /// Classify a mono waveform at the tagger rate.
    ///
    /// Softmax over the full label set; each label's probability
    /// accumulates into its mapped bucket (unmapped labels are dropped).
    /// The bucket with the highest accumulated score wins; ties resolve
    /// to the earliest bucket in `BUCKET_ORDER`. When every bucket score
    /// is zero (all probability mass on unmapped labels), the result is
    /// `noise`.
    pub fn classify(&self, waveform: &[f32]) -> Result<TaxonomyLabel> {
        let mut probs = self.tagger.infer(waveform)?;
        softmax_inplace(&mut probs);

        let mut scores = [0.0f32; BUCKET_ORDER.len()];
        for (label, prob) in self.tagger.labels().iter().zip(&probs) {
            if let Some(bucket) = self.map.bucket_for(label) {
                let idx = BUCKET_ORDER.iter().position(|b| *b == bucket).unwrap();
                scores[idx] += prob;
            }
        }

        debug!(
            music = format!("{:.2}%", scores[0] * 100.0),
            speech = format!("{:.2}%", scores[1] * 100.0),
            noise = format!("{:.2}%", scores[2] * 100.0),
            silence = format!("{:.2}%", scores[3] * 100.0),
            "Aggregated bucket probabilities"
        );

        let mut best = TaxonomyLabel::Noise;
        let mut best_score = 0.0f32;
        for (bucket, score) in BUCKET_ORDER.iter().zip(scores) {
            if score > best_score {
                best = *bucket;
                best_score = score;
            }
        }

        Ok(best)
    }
}

/// Numerically stable softmax (max subtraction).
fn softmax_inplace(logits: &mut [f32]) {
    if logits.is_empty() {
        return;
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for value in logits.iter_mut() {
        *value = (*value - max).exp();
        sum += *value;
    }
    for value in logits.iter_mut() {
        *value /= sum;
    }
}
