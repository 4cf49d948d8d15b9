use serde::{Deserialize, Serialize};
use cb_core::{JobStatus, ProgressSnapshot, SnapshotSource};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCreateResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One status event from the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushStatusEvent {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default)]
    pub error: Option<String>,
}

impl PushStatusEvent {
    pub fn into_snapshot(self) -> ProgressSnapshot {
        ProgressSnapshot {
            job_id: self.job_id,
            status: self.status,
            progress_percent: self.progress_percent,
            image_count: self.image_count,
            error_detail: self.error,
            source: SnapshotSource::Push,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_event_wire_format() {
        let event: PushStatusEvent = serde_json::from_str(
            r#"{"jobId":"j1","status":"processing","progressPercent":42,"imageCount":0,"error":null}"#,
        ).unwrap();
        let snapshot = event.into_snapshot();

        assert_eq!(snapshot.status, JobStatus::Processing);
        assert_eq!(snapshot.display_percent(), 42);
        assert_eq!(snapshot.source, SnapshotSource::Push);
    }

    #[test]
    fn test_create_response_tolerates_minimal_body() {
        let resp: JobCreateResponse = serde_json::from_str(r#"{"id":"j9"}"#).unwrap();
        assert_eq!(resp.id, "j9");
        assert!(resp.status.is_none());
    }
}
