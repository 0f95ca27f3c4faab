//! Face lock: keep a person's real face when an image generator has
//! redrawn it.
//!
//! [`FaceLock`] detects the face in the original photo and in the generated
//! image, then blends the original face over the generated one through a
//! feathered oval. Anything that prevents this returns the generated image
//! unchanged.

pub mod codec;
pub mod compositing;
pub mod detection;
pub mod geometry;
pub mod pipeline;
pub mod shared;

pub use pipeline::face_lock_use_case::{
    FaceLock, FaceLockError, FaceLockOutcome, FaceLockReport, Input, PassthroughReason,
};
pub use shared::config::FaceLockConfig;
