use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::CoreError;

/// Server-side lifecycle of a generation job, in advancement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Starting,
    Processing,
    Completing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ORDER: [JobStatus; 6] = [
        Self::Queued,
        Self::Starting,
        Self::Processing,
        Self::Completing,
        Self::Completed,
        Self::Failed,
    ];

    /// Position in the advancement order. A displayed status only ever moves
    /// to a strictly greater position.
    pub fn position(&self) -> usize {
        match self {
            Self::Queued => 0,
            Self::Starting => 1,
            Self::Processing => 2,
            Self::Completing => 3,
            Self::Completed => 4,
            Self::Failed => 5,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Percent shown when the server did not report one.
    pub fn default_percent(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Starting => 10,
            Self::Processing => 50,
            Self::Completing => 90,
            Self::Completed => 100,
            Self::Failed => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Completing => "completing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Queued => "⏳",
            Self::Starting => "🚀",
            Self::Processing => "⚡",
            Self::Completing => "✨",
            Self::Completed => "✅",
            Self::Failed => "❌",
        }
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One produced artifact (an image or a story page).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Job state as reported by `getJob`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub images: Vec<Artifact>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            progress_percent: None,
            images: Vec::new(),
            error_message: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn image_count(&self) -> u32 {
        u32::try_from(self.images.len()).unwrap_or(u32::MAX)
    }
}
