use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_CONFIDENCE_FLOOR, DEFAULT_FACE_PADDING, DEFAULT_FEATHER_PX, DEFAULT_JPEG_QUALITY,
    DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_IMAGE_SIZE,
};

pub const ENV_MODEL_PATH: &str = "FACELOCK_MODEL_PATH";
pub const ENV_MODEL_DIR: &str = "FACELOCK_MODEL_DIR";
pub const ENV_CONFIDENCE: &str = "FACELOCK_CONFIDENCE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunables for detection and compositing.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceLockConfig {
    /// Explicit detector artifact. Must exist when set.
    pub model_path: Option<PathBuf>,
    /// Extra directory searched for the default model name.
    pub model_dir: Option<PathBuf>,
    pub confidence_floor: f32,
    pub min_face_size: u32,
    pub min_image_size: u32,
    pub face_padding: f64,
    pub feather_px: u32,
    pub jpeg_quality: u8,
    /// Output tensor names to bind instead of guessing from shapes.
    pub boxes_output: Option<String>,
    pub scores_output: Option<String>,
    pub intra_threads: Option<usize>,
}

impl Default for FaceLockConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_dir: None,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            min_image_size: DEFAULT_MIN_IMAGE_SIZE,
            face_padding: DEFAULT_FACE_PADDING,
            feather_px: DEFAULT_FEATHER_PX,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            boxes_output: None,
            scores_output: None,
            intra_threads: None,
        }
    }
}

impl FaceLockConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Applies `FACELOCK_*` environment variables on top of `self`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_MODEL_PATH).filter(|v| !v.is_empty()) {
            self.model_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup(ENV_MODEL_DIR).filter(|v| !v.is_empty()) {
            self.model_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_CONFIDENCE) {
            match raw.parse::<f32>() {
                Ok(v) if (0.0..=1.0).contains(&v) => self.confidence_floor = v,
                _ => log::warn!("ignoring {ENV_CONFIDENCE}={raw:?}: expected a value in [0, 1]"),
            }
        }
        self
    }
}
