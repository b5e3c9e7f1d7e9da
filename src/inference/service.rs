//! Inference service: the shared, explicitly constructed scoring pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::InferenceError;

use super::preprocess::{preprocess, ModelInput};

/// Scores strictly above this value are classified as [`Diagnosis::Pneumonia`].
pub const DECISION_THRESHOLD: f32 = 0.5;

/// File name used when persisting the most recent upload.
pub const UPLOAD_FILE_NAME: &str = "image.jpg";

// =============================================================================
// Scoring Model
// =============================================================================

/// An opaque pretrained scoring function.
///
/// Implementations map one preprocessed input to a single score, conceptually
/// in `[0, 1]`. They are called from a blocking thread and may be shared
/// across concurrent requests.
pub trait ScoringModel: Send + Sync + 'static {
    /// Evaluate the model once on a single input.
    fn score(&self, input: &ModelInput) -> Result<f32, InferenceError>;
}

impl<M: ScoringModel + ?Sized> ScoringModel for Arc<M> {
    fn score(&self, input: &ModelInput) -> Result<f32, InferenceError> {
        (**self).score(input)
    }
}

// =============================================================================
// Diagnosis
// =============================================================================

/// Binary diagnostic label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Diagnosis {
    Pneumonia,
    Normal,
}

impl Diagnosis {
    /// Wire label (`"PNEUMONIA"` or `"NORMAL"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Pneumonia => "PNEUMONIA",
            Diagnosis::Normal => "NORMAL",
        }
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw score to a label. NaN scores are `Normal`.
#[inline]
pub fn classify(score: f32) -> Diagnosis {
    if score > DECISION_THRESHOLD {
        Diagnosis::Pneumonia
    } else {
        Diagnosis::Normal
    }
}

/// Result of scoring one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Raw model output
    pub score: f32,

    /// Thresholded label
    pub diagnosis: Diagnosis,
}

// =============================================================================
// Inference Service
// =============================================================================

/// Owns the loaded scoring model and runs predictions off the async executor.
pub struct InferenceService<M: ScoringModel> {
    model: Arc<M>,
    upload_dir: Option<PathBuf>,
}

impl<M: ScoringModel> InferenceService<M> {
    /// Create a service around an already-loaded model.
    pub fn new(model: M) -> Self {
        Self {
            model: Arc::new(model),
            upload_dir: None,
        }
    }

    /// Also write each incoming image to `<dir>/image.jpg`.
    ///
    /// The file is overwritten by every request and never read back.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    /// The configured upload directory, if any.
    pub fn upload_dir(&self) -> Option<&Path> {
        self.upload_dir.as_deref()
    }

    /// Score a raster and classify the result.
    ///
    /// Preprocessing and model evaluation run inside `spawn_blocking`; each
    /// call evaluates the model exactly once.
    pub async fn predict(&self, image: RgbImage) -> Result<Prediction, InferenceError> {
        let image = Arc::new(image);

        if let Some(dir) = &self.upload_dir {
            persist_upload(dir.clone(), Arc::clone(&image)).await;
        }

        let model = Arc::clone(&self.model);
        let score = tokio::task::spawn_blocking(move || {
            let input = preprocess(&image);
            model.score(&input)
        })
        .await
        .map_err(|e| InferenceError::Task(e.to_string()))??;

        let diagnosis = classify(score);
        info!(diagnosis = %diagnosis, score = score, "Prediction complete");

        Ok(Prediction { score, diagnosis })
    }
}

impl<M: ScoringModel> Clone for InferenceService<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            upload_dir: self.upload_dir.clone(),
        }
    }
}

/// Write the upload to disk. Failures are logged and otherwise ignored.
async fn persist_upload(dir: PathBuf, image: Arc<RgbImage>) {
    let result = tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
        let path = dir.join(UPLOAD_FILE_NAME);
        image.save(&path).map_err(|e| e.to_string())?;
        Ok::<PathBuf, String>(path)
    })
    .await;

    match result {
        Ok(Ok(path)) => debug!(path = %path.display(), "Persisted upload"),
        Ok(Err(message)) => warn!("Failed to persist upload: {}", message),
        Err(e) => warn!("Upload persistence task failed: {}", e),
    }
}

// =============================================================================
// Tests
// =============================================================================
