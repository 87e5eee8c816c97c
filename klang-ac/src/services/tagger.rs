//! Pretrained audio tagger
//!
//! `Tagger` is the inference seam: the production implementation wraps an
//! ONNX Runtime session, tests substitute a fake. The model and its label
//! vocabulary are loaded once at startup and shared read-only across all
//! classification calls; a load failure is fatal and aborts startup.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use klang_common::{Error, Result};

/// Model file expected inside the configured model directory
const MODEL_FILE: &str = "tagger.onnx";
/// Label vocabulary file (one fine-grained label per line, model output order)
const LABELS_FILE: &str = "labels.txt";
/// Input tensor name of the tagger graph
const INPUT_NAME: &str = "waveform";

/// A pretrained multi-class audio tagger.
///
/// `infer` takes a mono waveform at the tagger rate and returns one raw
/// logit per fine-grained label, in `labels()` order.
pub trait Tagger: Send + Sync {
    /// Fine-grained label vocabulary, in model output order.
    fn labels(&self) -> &[String];

    /// Run the tagger over a waveform, returning `labels().len()` logits.
    fn infer(&self, waveform: &[f32]) -> Result<Vec<f32>>;
}

/// ONNX Runtime tagger: `[1, n_samples]` f32 waveform in, `[1, n_labels]`
/// logits out.
#[derive(Debug)]
pub struct OnnxTagger {
    // ort sessions take &mut self to run
    session: Mutex<Session>,
    labels: Vec<String>,
}

impl OnnxTagger {
    /// Load the model and its label vocabulary from `model_dir`.
    ///
    /// Fails with `Error::ModelLoad` when either file is missing or
    /// invalid.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let labels_path = model_dir.join(LABELS_FILE);

        let raw = std::fs::read_to_string(&labels_path).map_err(|e| {
            Error::ModelLoad(format!(
                "failed to read label vocabulary {}: {}",
                labels_path.display(),
                e
            ))
        })?;
        let labels: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if labels.is_empty() {
            return Err(Error::ModelLoad(format!(
                "label vocabulary {} is empty",
                labels_path.display()
            )));
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(&model_path))
            .map_err(|e| {
                Error::ModelLoad(format!(
                    "failed to load tagger model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        info!(
            model = %model_path.display(),
            labels = labels.len(),
            "Tagger model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
        })
    }
}

impl Tagger for OnnxTagger {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn infer(&self, waveform: &[f32]) -> Result<Vec<f32>> {
        let input = Array2::from_shape_vec((1, waveform.len()), waveform.to_vec())
            .map_err(|e| Error::Internal(format!("tagger input shape error: {}", e)))?;
        let tensor = Tensor::from_array(input)
            .map_err(|e| Error::Internal(format!("tagger tensor creation error: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Internal("tagger session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![INPUT_NAME => tensor])
            .map_err(|e| Error::Internal(format!("tagger inference error: {}", e)))?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| Error::Internal("tagger produced no output".to_string()))?;
        let (_shape, logits) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Internal(format!("tagger output extraction error: {}", e)))?;

        if logits.len() != self.labels.len() {
            return Err(Error::Internal(format!(
                "tagger emitted {} logits for {} labels",
                logits.len(),
                self.labels.len()
            )));
        }

        Ok(logits.to_vec())
    }
}
