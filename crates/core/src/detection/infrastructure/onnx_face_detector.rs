/// Single-face detector on an ONNX Runtime session via `ort`.
///
/// Letterboxes the raster into the fixed square input, converts it to
/// mean-subtracted BGR planes, runs the session and decodes the single best
/// box back into raster coordinates.
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use ndarray::Array4;
use ort::session::Session;

use crate::detection::domain::detection_decoder::{self, DecodeParams, DetectorOutputs};
use crate::detection::domain::face_detector::{Detection, DetectorError, FaceDetector};
use crate::geometry::letterbox::Letterbox;
use crate::shared::config::FaceLockConfig;
use crate::shared::constants::{DETECTOR_BGR_MEAN, DETECTOR_INPUT_SIZE};
use crate::shared::raster::Raster;

use super::output_binding::{self, OutputBinding, OutputSignature};

/// Detector backed by an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so concurrent callers are
/// serialised on the session mutex.
pub struct OnnxFaceDetector {
    session: Mutex<Session>,
    binding: OutputBinding,
    input_size: u32,
    params: DecodeParams,
}

impl OnnxFaceDetector {
    /// Load the model and bind its outputs.
    ///
    /// The input side is read from the model's NCHW input shape and falls
    /// back to 640 when dynamic. A model without a boxes-shaped output is
    /// rejected here rather than on every call.
    pub fn load(model_path: &Path, config: &FaceLockConfig) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_path_buf()));
        }

        let mut builder = Session::builder()
            .map_err(ort_error)?
            .with_execution_providers(preferred_execution_providers())
            .map_err(ort_error)?;
        if let Some(threads) = config.intra_threads {
            builder = builder.with_intra_threads(threads).map_err(ort_error)?;
        }
        let session = builder.commit_from_file(model_path).map_err(ort_error)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DETECTOR_INPUT_SIZE);

        let signatures: Vec<OutputSignature> = session
            .outputs()
            .iter()
            .map(|output| {
                let shape = match output.dtype() {
                    ort::value::ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
                    _ => Vec::new(),
                };
                OutputSignature {
                    name: output.name().to_string(),
                    shape,
                }
            })
            .collect();

        let binding = output_binding::resolve_binding(
            &signatures,
            config.boxes_output.as_deref(),
            config.scores_output.as_deref(),
        )
        .map_err(|e| DetectorError::OutputShape(e.to_string()))?;

        log::info!(
            "Loaded face detector {} (input {input_size}px, outputs {:?}, boxes={}, scores={:?})",
            model_path.display(),
            signatures,
            signatures[binding.boxes].name,
            binding.scores.map(|s| (&signatures[s.index].name, s.layout)),
        );
        if binding.scores.is_none() {
            log::warn!("Face detector exposes no score output; the first box will always be used");
        }

        Ok(Self {
            session: Mutex::new(session),
            binding,
            input_size,
            params: DecodeParams {
                confidence_floor: config.confidence_floor,
                min_face_size: config.min_face_size,
            },
        })
    }

    fn infer(&self, input: Array4<f32>) -> Result<DetectorOutputs, DetectorError> {
        let input_value = ort::value::Tensor::from_array(input).map_err(ort_error)?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(ort_error)?;
        if outputs.len() <= self.binding.boxes {
            return Err(DetectorError::OutputShape(format!(
                "model produced {} outputs, boxes bound to #{}",
                outputs.len(),
                self.binding.boxes
            )));
        }

        let box_data: Vec<f32> = outputs[self.binding.boxes]
            .try_extract_array::<f32>()
            .map_err(|e| DetectorError::OutputShape(format!("boxes: {e}")))?
            .iter()
            .copied()
            .collect();
        if box_data.len() % 4 != 0 {
            return Err(DetectorError::OutputShape(format!(
                "boxes tensor has {} values, not a multiple of 4",
                box_data.len()
            )));
        }
        let boxes: Vec<[f32; 4]> = box_data
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();

        let scores = match self.binding.scores {
            Some(binding) if binding.index < outputs.len() => {
                match outputs[binding.index].try_extract_array::<f32>() {
                    Ok(view) => {
                        let raw: Vec<f32> = view.iter().copied().collect();
                        Some(output_binding::scores_per_detection(
                            &raw,
                            binding.layout,
                            boxes.len(),
                        ))
                    }
                    Err(e) => {
                        log::warn!("Score tensor unreadable ({e}); falling back to first box");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(DetectorOutputs { boxes, scores })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&self, raster: &Raster) -> Result<Option<Detection>, DetectorError> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(DetectorError::InvalidInput(format!(
                "{}x{} raster",
                raster.width(),
                raster.height()
            )));
        }

        let (input, letterbox) = prepare_input(raster, self.input_size);
        let outputs = self.infer(input)?;
        Ok(detection_decoder::decode(
            &outputs,
            &letterbox,
            raster.width(),
            raster.height(),
            &self.params,
        ))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox a raster into a `1 × 3 × size × size` BGR tensor with the
/// per-channel means subtracted.
///
/// Nearest-neighbour sampling. Padding cells stay 0.0, i.e. a mean-coloured
/// pixel after subtraction. Alpha is ignored. An empty raster yields an
/// all-padding tensor.
pub fn prepare_input(raster: &Raster, size: u32) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::compute(raster.width(), raster.height(), size);
    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    if raster.width() == 0 || raster.height() == 0 {
        return (tensor, letterbox);
    }

    let src = raster.as_ndarray(); // [H, W, RGBA]
    let src_h = raster.height() as usize;
    let src_w = raster.width() as usize;
    let [mean_b, mean_g, mean_r] = DETECTOR_BGR_MEAN;

    for y in 0..letterbox.scaled_h as usize {
        let src_y = ((y as f64 / letterbox.scale) as usize).min(src_h - 1);
        let ty = letterbox.pad_y as usize + y;
        for x in 0..letterbox.scaled_w as usize {
            let src_x = ((x as f64 / letterbox.scale) as usize).min(src_w - 1);
            let tx = letterbox.pad_x as usize + x;
            tensor[[0, 0, ty, tx]] = src[[src_y, src_x, 2]] as f32 - mean_b;
            tensor[[0, 1, ty, tx]] = src[[src_y, src_x, 1]] as f32 - mean_g;
            tensor[[0, 2, ty, tx]] = src[[src_y, src_x, 0]] as f32 - mean_r;
        }
    }

    (tensor, letterbox)
}

/// Platform execution providers; CPU is always the implicit fallback.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

fn ort_error(e: impl std::fmt::Display) -> DetectorError {
    DetectorError::Inference(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_prepare_input_shape() {
        let raster = Raster::filled(800, 1000, [0, 0, 0, 255]);
        let (tensor, letterbox) = prepare_input(&raster, 640);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_eq!((letterbox.pad_x, letterbox.pad_y), (64, 0));
    }

    #[test]
    fn test_prepare_input_bgr_order_and_means() {
        let raster = Raster::filled(100, 100, [200, 150, 50, 255]);
        let (tensor, _) = prepare_input(&raster, 640);
        assert_relative_eq!(tensor[[0, 0, 320, 320]], 50.0 - 104.0);
        assert_relative_eq!(tensor[[0, 1, 320, 320]], 150.0 - 117.0);
        assert_relative_eq!(tensor[[0, 2, 320, 320]], 200.0 - 123.0);
    }

    #[test]
    fn test_prepare_input_padding_is_zero() {
        // Wide raster: scale 3.2, scaled 640x320, pad_y 160
        let raster = Raster::filled(200, 100, [255, 255, 255, 255]);
        let (tensor, letterbox) = prepare_input(&raster, 640);
        assert_eq!(letterbox.pad_y, 160);
        for c in 0..3 {
            assert_eq!(tensor[[0, c, 0, 0]], 0.0);
            assert_eq!(tensor[[0, c, 639, 639]], 0.0);
            assert_relative_eq!(
                tensor[[0, c, 160, 0]],
                255.0 - DETECTOR_BGR_MEAN[c]
            );
        }
    }

    #[test]
    fn test_prepare_input_maps_pixels_through_letterbox() {
        // Mark a source pixel and find it at its letterboxed position.
        let mut raster = Raster::filled(320, 320, [0, 0, 0, 255]);
        raster.set_pixel(100, 50, [255, 0, 0, 255]);
        let (tensor, letterbox) = prepare_input(&raster, 640);
        let (dx, dy) = letterbox.to_detector(100.0, 50.0);
        // Red lands in the R plane (index 2).
        assert_relative_eq!(tensor[[0, 2, dy as usize, dx as usize]], 255.0 - 123.0);
        assert_relative_eq!(tensor[[0, 0, dy as usize, dx as usize]], -104.0);
    }

    #[test]
    fn test_prepare_input_ignores_alpha() {
        let opaque = Raster::filled(64, 64, [10, 20, 30, 255]);
        let clear = Raster::filled(64, 64, [10, 20, 30, 0]);
        assert_eq!(prepare_input(&opaque, 640).0, prepare_input(&clear, 640).0);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(0, 120)]
    #[case(90, 0)]
    fn test_prepare_input_empty_raster_is_all_padding(#[case] w: u32, #[case] h: u32) {
        let raster = Raster::new(Vec::new(), w, h);
        let (tensor, _) = prepare_input(&raster, 64);
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert!(tensor.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_load_missing_model_is_not_found() {
        let result = OnnxFaceDetector::load(
            Path::new("/nonexistent/face_detector_640.onnx"),
            &FaceLockConfig::default(),
        );
        assert!(matches!(result, Err(DetectorError::ModelNotFound(_))));
    }

    #[test]
    fn test_load_corrupt_model_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"not an onnx model").unwrap();
        assert!(OnnxFaceDetector::load(&path, &FaceLockConfig::default()).is_err());
    }
}
