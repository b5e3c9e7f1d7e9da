//! Inference adapter.
//!
//! Turns a decoded RGB raster into a diagnosis:
//!
//! ```text
//! RgbImage ──► preprocess() ──► ModelInput ──► ScoringModel::score() ──► f32 ──► classify()
//!              (64x64, [-1,1])   (NHWC, batch 1)                                  │
//!                                                                                 ▼
//!                                                                      PNEUMONIA | NORMAL
//! ```
//!
//! The scoring model is loaded once at startup and handed to the
//! [`InferenceService`], which is shared by reference across requests.

mod convnet;
mod preprocess;
mod service;

pub use convnet::ConvNetScorer;
pub use preprocess::{preprocess, ModelInput, INPUT_CHANNELS, INPUT_SIZE};
pub use service::{
    classify, Diagnosis, InferenceService, Prediction, ScoringModel, DECISION_THRESHOLD,
    UPLOAD_FILE_NAME,
};
