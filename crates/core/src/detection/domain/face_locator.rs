use crate::shared::bounding_box::BoundingBox;
use crate::shared::raster::Raster;

use super::face_detector::{DetectorError, FaceDetector};

/// Default fraction of the tight box added on each side.
pub const DEFAULT_PADDING: f64 = crate::shared::constants::DEFAULT_FACE_PADDING;

/// Finds the face in a raster and pads the detector's tight box.
///
/// Tight boxes tend to clip the chin and forehead; the padding leaves the
/// compositor room to feather before the jawline.
pub struct FaceLocator {
    padding: f64,
}

impl FaceLocator {
    pub fn new(padding: f64) -> Self {
        Self {
            padding: padding.max(0.0),
        }
    }

    pub fn locate(
        &self,
        detector: &dyn FaceDetector,
        raster: &Raster,
    ) -> Result<Option<BoundingBox>, DetectorError> {
        let detection = detector.detect(raster)?;
        Ok(detection.map(|d| d.bbox.expand(self.padding, raster.width(), raster.height())))
    }
}

impl Default for FaceLocator {
    fn default() -> Self {
        Self::new(DEFAULT_PADDING)
    }
}
