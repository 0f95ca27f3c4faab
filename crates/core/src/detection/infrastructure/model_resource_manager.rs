use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::config::FaceLockConfig;

use super::model_resolver;
use super::onnx_face_detector::OnnxFaceDetector;

pub type LoadResult = Result<Arc<dyn FaceDetector>, Box<dyn Error + Send + Sync>>;

/// Produces a ready detector, or the reason it could not be built.
pub type DetectorLoader = Box<dyn Fn() -> LoadResult + Send + Sync>;

/// Lazily loads the face detector once per process and hands out shared
/// handles.
///
/// The first caller runs the loader; concurrent callers block until it
/// finishes. A failed load is remembered, so later callers get `None`
/// without retrying. A loader that panics counts as a failed load.
pub struct ModelResourceManager {
    loader: DetectorLoader,
    slot: Mutex<SlotState>,
    ready: Condvar,
}

enum SlotState {
    Unloaded,
    Loading,
    Loaded(Option<Arc<dyn FaceDetector>>),
}

impl ModelResourceManager {
    pub fn new(loader: DetectorLoader) -> Self {
        Self {
            loader,
            slot: Mutex::new(SlotState::Unloaded),
            ready: Condvar::new(),
        }
    }

    /// Manager that resolves the model from `config` and loads it with ONNX
    /// Runtime on first use.
    pub fn from_config(config: FaceLockConfig) -> Self {
        Self::new(Box::new(move || -> LoadResult {
            let path = model_resolver::resolve(&config)?;
            let detector = OnnxFaceDetector::load(&path, &config)?;
            Ok(Arc::new(detector) as Arc<dyn FaceDetector>)
        }))
    }

    /// Manager with a detector that is already loaded.
    pub fn preloaded(detector: Arc<dyn FaceDetector>) -> Self {
        let manager = Self::new(Box::new(|| -> LoadResult {
            Err("preloaded manager never loads".into())
        }));
        *manager.slot.lock().unwrap_or_else(PoisonError::into_inner) =
            SlotState::Loaded(Some(detector));
        manager
    }

    /// The shared detector, or `None` when it is unavailable.
    ///
    /// Loads on the first call. The outcome, success or failure, is cached
    /// for the lifetime of the manager.
    pub fn session(&self) -> Option<Arc<dyn FaceDetector>> {
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match &*guard {
                SlotState::Loaded(detector) => return detector.clone(),
                SlotState::Unloaded => break,
                SlotState::Loading => {}
            }
            guard = self
                .ready
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *guard = SlotState::Loading;
        drop(guard);

        let detector = self.load();

        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = SlotState::Loaded(detector.clone());
        drop(guard);
        self.ready.notify_all();
        detector
    }

    /// Whether a load has completed with a usable detector. Never triggers a
    /// load.
    pub fn is_available(&self) -> bool {
        matches!(
            &*self.slot.lock().unwrap_or_else(PoisonError::into_inner),
            SlotState::Loaded(Some(_))
        )
    }

    fn load(&self) -> Option<Arc<dyn FaceDetector>> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.loader)())) {
            Ok(Ok(detector)) => Some(detector),
            Ok(Err(e)) => {
                log::warn!("Face detector unavailable, face lock disabled: {e}");
                None
            }
            Err(_) => {
                log::error!("Face detector loader panicked, face lock disabled");
                None
            }
        }
    }
}
