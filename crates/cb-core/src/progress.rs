//! Displayed progress for one generation job and the advancement rule that
//! reconciles the push channel with polled reads.
//!
//! The rule is the only ordering authority: a snapshot is accepted when its
//! status sits strictly later in [`JobStatus::ORDER`] than the displayed one.
//! Within the same non-terminal status the percent may rise but never fall.
//! Once the displayed status is terminal nothing is accepted.

use crate::job::{GenerationJob, JobStatus};

/// Where a snapshot came from. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotSource {
    #[default]
    Initial,
    Push,
    Poll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub progress_percent: Option<u8>,
    pub image_count: u32,
    pub error_detail: Option<String>,
    pub source: SnapshotSource,
}

/// Outcome of offering a snapshot to the displayed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Status moved forward.
    Advanced,
    /// Same status, higher percent, from the push channel.
    Refreshed,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ForeignJob,
    Terminal,
    Stale,
}

impl ProgressSnapshot {
    /// What is displayed before any sample arrived.
    pub fn initial(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            progress_percent: None,
            image_count: 0,
            error_detail: None,
            source: SnapshotSource::Initial,
        }
    }

    pub fn new(job_id: impl Into<String>, status: JobStatus, progress_percent: Option<u8>, source: SnapshotSource) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            progress_percent,
            image_count: 0,
            error_detail: None,
            source,
        }
    }

    pub fn from_job(job: &GenerationJob, source: SnapshotSource) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress_percent: job.progress_percent,
            image_count: job.image_count(),
            error_detail: job.error_message.clone(),
            source,
        }
    }

    pub fn with_error(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Server percent when present, otherwise the status default.
    pub fn display_percent(&self) -> u8 {
        self.progress_percent
            .map(|p| p.min(100))
            .unwrap_or_else(|| self.status.default_percent())
    }

    /// Decide what `incoming` would do to this snapshot without applying it.
    pub fn evaluate(&self, incoming: &ProgressSnapshot) -> Verdict {
        if incoming.job_id != self.job_id {
            return Verdict::Rejected(RejectReason::ForeignJob);
        }
        if self.is_terminal() {
            return Verdict::Rejected(RejectReason::Terminal);
        }

        let current = self.status.position();
        let next = incoming.status.position();

        // a poll never moves percent within a status, only the push channel does
        if next > current {
            Verdict::Advanced
        } else if next == current
            && incoming.source == SnapshotSource::Push
            && incoming.display_percent() > self.display_percent()
        {
            Verdict::Refreshed
        } else {
            Verdict::Rejected(RejectReason::Stale)
        }
    }

    /// Apply `incoming` in place according to the advancement rule.
    pub fn apply(&mut self, incoming: &ProgressSnapshot) -> Verdict {
        let verdict = self.evaluate(incoming);

        match verdict {
            Verdict::Advanced => {
                self.progress_percent = match incoming.status {
                    JobStatus::Completed | JobStatus::Failed => incoming.progress_percent.map(|p| p.min(100)),
                    _ => Some(incoming.display_percent().max(self.display_percent())),
                };
                self.status = incoming.status;
                self.image_count = self.image_count.max(incoming.image_count);
                self.error_detail = incoming.error_detail.clone();
                self.source = incoming.source;
            }
            Verdict::Refreshed => {
                self.progress_percent = Some(incoming.display_percent());
                self.image_count = self.image_count.max(incoming.image_count);
                self.source = incoming.source;
            }
            Verdict::Rejected(_) => {}
        }

        verdict
    }
}

/// Pure form of [`ProgressSnapshot::apply`].
pub fn reduce(current: &ProgressSnapshot, incoming: &ProgressSnapshot) -> ProgressSnapshot {
    let mut next = current.clone();
    next.apply(incoming);
    next
}
