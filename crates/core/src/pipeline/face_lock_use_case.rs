use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::codec::image_decoder::{self, DecodedImage};
use crate::codec::image_encoder;
use crate::codec::CodecError;
use crate::compositing::{alpha_blend, patch};
use crate::detection::domain::face_detector::{DetectorError, FaceDetector};
use crate::detection::domain::face_locator::FaceLocator;
use crate::detection::infrastructure::model_resource_manager::ModelResourceManager;
use crate::geometry::oval_mask::oval_mask;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::FaceLockConfig;
use crate::shared::raster::Raster;

/// Which input a stage was working on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Original,
    Generated,
}

#[derive(Error, Debug)]
pub enum FaceLockError {
    #[error("face detector unavailable")]
    SessionUnavailable,
    #[error("{0:?} image: {1}")]
    Decode(Input, #[source] CodecError),
    #[error("{input:?} image is {width}x{height}, below the {min}px minimum")]
    ImageTooSmall {
        input: Input,
        width: u32,
        height: u32,
        min: u32,
    },
    #[error("no face in original image")]
    NoFaceInOriginal,
    #[error("no face in generated image")]
    NoFaceInGenerated,
    #[error("{0:?} image: {1}")]
    Detector(Input, #[source] DetectorError),
    #[error("re-encode failed: {0}")]
    Encode(#[source] CodecError),
}

/// Why the generated bytes were returned untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassthroughReason {
    SessionUnavailable,
    Decode,
    ImageTooSmall,
    NoFaceInOriginal,
    NoFaceInGenerated,
    Detector,
    Encode,
    /// An invariant was violated somewhere in the pipeline.
    Panic,
}

impl FaceLockError {
    pub fn reason(&self) -> PassthroughReason {
        match self {
            Self::SessionUnavailable => PassthroughReason::SessionUnavailable,
            Self::Decode(..) => PassthroughReason::Decode,
            Self::ImageTooSmall { .. } => PassthroughReason::ImageTooSmall,
            Self::NoFaceInOriginal => PassthroughReason::NoFaceInOriginal,
            Self::NoFaceInGenerated => PassthroughReason::NoFaceInGenerated,
            Self::Detector(..) => PassthroughReason::Detector,
            Self::Encode(_) => PassthroughReason::Encode,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceLockOutcome {
    Composited {
        original_box: BoundingBox,
        generated_box: BoundingBox,
    },
    Passthrough(PassthroughReason),
}

#[derive(Debug, Clone)]
pub struct FaceLockReport {
    pub bytes: Vec<u8>,
    pub outcome: FaceLockOutcome,
}

/// Restores the face from an original photo onto a generated image:
/// decode → detect both → crop → resample → feathered blend → encode.
///
/// Best effort. Every failure, including a panic inside the pipeline,
/// yields the generated bytes unchanged. Safe to share across threads;
/// the detector is loaded once through the [`ModelResourceManager`].
pub struct FaceLock {
    resources: Arc<ModelResourceManager>,
    locator: FaceLocator,
    config: FaceLockConfig,
}

impl FaceLock {
    pub fn new(resources: Arc<ModelResourceManager>, config: FaceLockConfig) -> Self {
        Self {
            resources,
            locator: FaceLocator::new(config.face_padding),
            config,
        }
    }

    /// Face lock with the ONNX detector resolved from `config`.
    pub fn from_config(config: FaceLockConfig) -> Self {
        let resources = Arc::new(ModelResourceManager::from_config(config.clone()));
        Self::new(resources, config)
    }

    /// The composited image, or `generated` unchanged when face lock cannot
    /// run.
    pub fn face_lock(&self, original: &[u8], generated: &[u8]) -> Vec<u8> {
        self.run(original, generated).bytes
    }

    /// Like [`FaceLock::face_lock`], also reporting what happened.
    pub fn run(&self, original: &[u8], generated: &[u8]) -> FaceLockReport {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.composite(original, generated)));
        match attempt {
            Ok(Ok((bytes, original_box, generated_box))) => {
                log::info!(
                    "Face lock applied: original {original_box:?} -> generated {generated_box:?}"
                );
                FaceLockReport {
                    bytes,
                    outcome: FaceLockOutcome::Composited {
                        original_box,
                        generated_box,
                    },
                }
            }
            Ok(Err(e)) => {
                match &e {
                    FaceLockError::Detector(..) | FaceLockError::Encode(_) => {
                        log::warn!("Face lock skipped: {e}")
                    }
                    _ => log::debug!("Face lock skipped: {e}"),
                }
                passthrough(generated, e.reason())
            }
            Err(_) => {
                log::error!("Face lock panicked; returning generated image unchanged");
                passthrough(generated, PassthroughReason::Panic)
            }
        }
    }

    /// Padded face box in an encoded image, without compositing. `input`
    /// labels any error with the image it came from.
    pub fn locate(&self, image: &[u8], input: Input) -> Result<Option<BoundingBox>, FaceLockError> {
        let detector = self
            .resources
            .session()
            .ok_or(FaceLockError::SessionUnavailable)?;
        let decoded = self.decode(image, input)?;
        self.find(&*detector, &decoded.raster, input)
    }

    fn composite(
        &self,
        original: &[u8],
        generated: &[u8],
    ) -> Result<(Vec<u8>, BoundingBox, BoundingBox), FaceLockError> {
        let detector = self
            .resources
            .session()
            .ok_or(FaceLockError::SessionUnavailable)?;

        let (original, generated) = timed("decode", || {
            Ok::<_, FaceLockError>((
                self.decode(original, Input::Original)?,
                self.decode(generated, Input::Generated)?,
            ))
        })?;

        let (original_box, generated_box) = timed("detect", || {
            let original_box = self
                .find(&*detector, &original.raster, Input::Original)?
                .ok_or(FaceLockError::NoFaceInOriginal)?;
            let generated_box = self
                .find(&*detector, &generated.raster, Input::Generated)?
                .ok_or(FaceLockError::NoFaceInGenerated)?;
            Ok::<_, FaceLockError>((original_box, generated_box))
        })?;

        let DecodedImage {
            raster: mut canvas,
            format,
        } = generated;
        timed("composite", || {
            paste_face(
                &mut canvas,
                &original.raster,
                &original_box,
                &generated_box,
                self.config.feather_px,
            )
        });

        let bytes = timed("encode", || {
            image_encoder::encode(&canvas, format, self.config.jpeg_quality)
        })
        .map_err(FaceLockError::Encode)?;

        Ok((bytes, original_box, generated_box))
    }

    fn decode(&self, bytes: &[u8], input: Input) -> Result<DecodedImage, FaceLockError> {
        let decoded = image_decoder::decode(bytes).map_err(|e| FaceLockError::Decode(input, e))?;
        let (width, height) = (decoded.raster.width(), decoded.raster.height());
        let min = self.config.min_image_size;
        if width < min || height < min {
            return Err(FaceLockError::ImageTooSmall {
                input,
                width,
                height,
                min,
            });
        }
        Ok(decoded)
    }

    fn find(
        &self,
        detector: &dyn FaceDetector,
        raster: &Raster,
        input: Input,
    ) -> Result<Option<BoundingBox>, FaceLockError> {
        self.locator
            .locate(detector, raster)
            .map_err(|e| FaceLockError::Detector(input, e))
    }
}

/// Crop the original face, stretch it onto the generated face box and blend
/// it in through a feathered oval.
fn paste_face(
    canvas: &mut Raster,
    original: &Raster,
    original_box: &BoundingBox,
    generated_box: &BoundingBox,
    feather_px: u32,
) {
    let face = patch::crop(original, original_box);
    let face = patch::resize_to_fill(&face, generated_box.width, generated_box.height);
    let mask = oval_mask(generated_box.width, generated_box.height, feather_px);
    alpha_blend::blend_over(canvas, &face, &mask, (generated_box.x, generated_box.y));
}

fn passthrough(generated: &[u8], reason: PassthroughReason) -> FaceLockReport {
    FaceLockReport {
        bytes: generated.to_vec(),
        outcome: FaceLockOutcome::Passthrough(reason),
    }
}

fn timed<T>(stage: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    log::debug!(
        "face lock {stage}: {:.2}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
