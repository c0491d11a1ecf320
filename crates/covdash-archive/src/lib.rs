//! The capture archive: on-disk store, change detection against the latest
//! capture, and the fetch-detect-write cycle that ties them together.

pub mod detect;
pub mod error;
mod lock;
pub mod orchestrate;
pub mod store;

pub use detect::{changed_images, ChangeDetector, Detection, Verdict};
pub use error::{DetectError, OrchestratorError, StoreError};
pub use orchestrate::{local_now, CaptureOrchestrator, CaptureOutcome, Clock};
pub use store::ArchiveStore;
