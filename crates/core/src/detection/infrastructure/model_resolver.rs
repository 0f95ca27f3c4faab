use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::config::FaceLockConfig;
use crate::shared::constants::{CACHE_APP_DIR, FACE_MODEL_NAME};

/// Directory next to the working directory checked last, for development
/// checkouts and pre-packaged installs.
pub const BUNDLED_MODEL_DIR: &str = "models";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("configured model path does not exist: {0}")]
    ExplicitPathMissing(PathBuf),
    #[error("model {name} not found (searched: {searched:?})")]
    NotFound {
        name: String,
        searched: Vec<PathBuf>,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Locate the detector artifact.
///
/// Resolution order:
/// 1. `config.model_path` (must exist, no further search)
/// 2. `config.model_dir`
/// 3. User cache directory (platform-specific)
/// 4. Bundled `./models`
pub fn resolve(config: &FaceLockConfig) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = match model_cache_dir() {
        Ok(dir) => Some(dir),
        Err(e) => {
            log::debug!("Skipping cache lookup: {e}");
            None
        }
    };
    resolve_in(config, cache_dir.as_deref(), Path::new(BUNDLED_MODEL_DIR))
}

/// [`resolve`] with the cache and bundled directories supplied by the caller.
pub fn resolve_in(
    config: &FaceLockConfig,
    cache_dir: Option<&Path>,
    bundled_dir: &Path,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(ref explicit) = config.model_path {
        return if explicit.is_file() {
            Ok(explicit.clone())
        } else {
            Err(ModelResolveError::ExplicitPathMissing(explicit.clone()))
        };
    }

    let candidates: Vec<PathBuf> = config
        .model_dir
        .as_deref()
        .into_iter()
        .chain(cache_dir)
        .chain(std::iter::once(bundled_dir))
        .map(|dir| dir.join(FACE_MODEL_NAME))
        .collect();

    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }

    Err(ModelResolveError::NotFound {
        name: FACE_MODEL_NAME.to_string(),
        searched: candidates,
    })
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceLock/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceLock/models/` or `~/.cache/FaceLock/models/`
/// - Windows: `%LOCALAPPDATA%/FaceLock/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(CACHE_APP_DIR).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(CACHE_APP_DIR).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}
