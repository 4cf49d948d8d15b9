use cb_core::{GenerationJob, ProgressSnapshot};
use crate::error::TrackerError;

/// What a tracking session delivers to the owning screen.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// The displayed snapshot changed.
    Progress(ProgressSnapshot),
    /// Terminal success, with the full job detail.
    Completed(GenerationJob),
    /// Terminal failure of any kind.
    Failed {
        job_id: String,
        error: TrackerError,
    },
}

impl TrackerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed { .. })
    }
}
