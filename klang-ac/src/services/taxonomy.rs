//! Fine-grained label to taxonomy bucket reduction
//!
//! The tagger model emits hundreds of fine-grained labels ("Violin,
//! fiddle", "Speech synthesizer", ...). `TaxonomyMap` folds that
//! vocabulary into the four-class taxonomy through keyword substring
//! matching. The map is built exactly once at startup and shared
//! read-only by all concurrent classifications.

use std::collections::HashMap;

use crate::models::TaxonomyLabel;

/// Fixed bucket iteration order.
///
/// Used both for keyword matching precedence during construction and for
/// tie-breaking during score aggregation: the earliest bucket wins.
pub const BUCKET_ORDER: [TaxonomyLabel; 4] = [
    TaxonomyLabel::Music,
    TaxonomyLabel::Speech,
    TaxonomyLabel::Noise,
    TaxonomyLabel::Silence,
];

/// Keyword substrings per bucket, tested against lowercased labels.
const BUCKET_KEYWORDS: [(TaxonomyLabel, &[&str]); 4] = [
    (
        TaxonomyLabel::Music,
        &[
            "music",
            "musical",
            "instrument",
            "singing",
            "choir",
            "song",
            "guitar",
            "piano",
            "drum",
            "orchestra",
            "symphony",
            "cello",
            "violin",
            "flute",
        ],
    ),
    (
        TaxonomyLabel::Speech,
        &[
            "speech",
            "speaking",
            "speech synthesizer",
            "chatter",
            "narration",
            "vocal music",
            "acapella",
        ],
    ),
    (
        TaxonomyLabel::Noise,
        &[
            "noise",
            "engine",
            "wind",
            "crackle",
            "siren",
            "gunshot",
            "explosion",
            "machine",
            "hiss",
            "hum",
            "rumble",
            "vehicle",
        ],
    ),
    (TaxonomyLabel::Silence, &["silence"]),
];

/// Immutable lookup from a fine-grained label to its taxonomy bucket.
///
/// Labels matching no keyword are left unmapped and excluded from
/// aggregation entirely.
#[derive(Debug, Clone)]
pub struct TaxonomyMap {
    map: HashMap<String, TaxonomyLabel>,
}

impl TaxonomyMap {
    /// Build the reduction table for a tagger vocabulary.
    ///
    /// For each label: lowercase it, test each bucket's keyword list in
    /// `BUCKET_ORDER`; the first bucket with a substring match wins.
    /// Pure function of its input; repeated builds are identical.
    pub fn build(vocabulary: &[String]) -> Self {
        let mut map = HashMap::new();

        for label in vocabulary {
            let lowered = label.to_lowercase();
            for (bucket, keywords) in BUCKET_KEYWORDS {
                if keywords.iter().any(|kw| lowered.contains(kw)) {
                    map.insert(label.clone(), bucket);
                    break;
                }
            }
        }

        Self { map }
    }

    /// Bucket for a fine-grained label, `None` when unmapped.
    pub fn bucket_for(&self, label: &str) -> Option<TaxonomyLabel> {
        self.map.get(label).copied()
    }

    /// Number of mapped labels.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
