//! Request, response, and result models for the classification service

use serde::{Deserialize, Serialize};

/// The four-class taxonomy every classification collapses into.
///
/// Serialized lowercase in responses and cached values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyLabel {
    Music,
    Speech,
    Noise,
    Silence,
}

impl TaxonomyLabel {
    /// Stable label string, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyLabel::Music => "music",
            TaxonomyLabel::Speech => "speech",
            TaxonomyLabel::Noise => "noise",
            TaxonomyLabel::Silence => "silence",
        }
    }
}

impl std::fmt::Display for TaxonomyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing the original resource, as decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Duration in seconds, rounded to 2 decimals
    pub duration: f64,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the original resource (>= 1)
    pub channels: u32,
}

/// The unit written to the cache and returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(flatten)]
    pub features: AudioFeatures,
    pub classification: TaxonomyLabel,
}

/// Request body for `POST /analyze-audio`
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// http(s) URL of the audio resource to analyze
    pub audio_url: String,
}

/// Top-level success envelope for `POST /analyze-audio`
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub data: ClassificationResult,
}

impl AnalyzeResponse {
    pub fn success(data: ClassificationResult) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}
