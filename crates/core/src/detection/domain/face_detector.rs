use std::path::PathBuf;

use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::raster::Raster;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected detector output: {0}")]
    OutputShape(String),
    #[error("invalid input raster: {0}")]
    InvalidInput(String),
}

/// The single face a detector settled on, in the coordinate space of the
/// raster it was run on. Already above the confidence floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// `None` when the model exposes no usable score tensor.
    pub confidence: Option<f32>,
}

/// Domain interface for single-face detection.
///
/// `Ok(None)` is a miss (nothing above the floor, or too small);
/// `Err` means detection could not run at all. Implementations are shared
/// across concurrent requests, hence `&self` and `Sync`.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, raster: &Raster) -> Result<Option<Detection>, DetectorError>;
}
