/// Default detector artifact looked up in the model search directories.
pub const FACE_MODEL_NAME: &str = "face_detector_640.onnx";

/// Application folder under the per-user cache directory.
pub const CACHE_APP_DIR: &str = "FaceLock";

/// Square detector input side in pixels.
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// Per-channel means subtracted in B, G, R order. Must match the
/// detector's training preprocessing exactly.
pub const DETECTOR_BGR_MEAN: [f32; 3] = [104.0, 117.0, 123.0];

pub const DEFAULT_CONFIDENCE_FLOOR: f32 = 0.5;

/// Boxes narrower or shorter than this after clamping count as a miss.
pub const DEFAULT_MIN_FACE_SIZE: u32 = 16;

/// Inputs narrower or shorter than this are passed through untouched.
pub const DEFAULT_MIN_IMAGE_SIZE: u32 = 32;

/// Fraction of the tight box added on each side before compositing.
pub const DEFAULT_FACE_PADDING: f64 = 0.15;

/// Width of the linear opacity ramp at the mask edge.
pub const DEFAULT_FEATHER_PX: u32 = 25;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Ellipse semi-axes as a fraction of the half box width/height.
pub const OVAL_RX_FACTOR: f64 = 0.85;
pub const OVAL_RY_FACTOR: f64 = 0.9;
