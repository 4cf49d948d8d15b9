pub mod error;
pub mod job;
pub mod progress;
mod generation_types;

pub use error::CoreError;
pub use generation_types::{GenerationKind, GenerationRequest};
pub use job::{Artifact, GenerationJob, JobStatus};
pub use progress::{ProgressSnapshot, RejectReason, SnapshotSource, Verdict};
