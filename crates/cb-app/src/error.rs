use thiserror::Error;

/// Failures talking to collaborators (backend, push channel, image host).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error from backend: HTTP {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("push channel error: {0}")]
    Push(String),
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no credential available")]
    MissingCredential,
}

/// What a tracking session reports to its error callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("not signed in")]
    Authentication,
    #[error("network error: {0}")]
    Transport(String),
    #[error("{0}")]
    GenerationFailed(String),
    #[error("generation did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },
}

impl TrackerError {
    pub const GENERIC_FAILURE: &'static str = "Generation failed. Please try again.";

    pub fn generation_failed(detail: Option<&str>) -> Self {
        let detail = detail.map(str::trim).filter(|d| !d.is_empty());
        Self::GenerationFailed(detail.unwrap_or(Self::GENERIC_FAILURE).to_string())
    }
}

impl From<AppError> for TrackerError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::MissingCredential => Self::Authentication,
            AppError::Backend { status: 401 | 403, .. } => Self::Authentication,
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_failure_text() {
        assert_eq!(
            TrackerError::generation_failed(None),
            TrackerError::GenerationFailed(TrackerError::GENERIC_FAILURE.into())
        );
        assert_eq!(
            TrackerError::generation_failed(Some("  ")),
            TrackerError::GenerationFailed(TrackerError::GENERIC_FAILURE.into())
        );
        assert_eq!(
            TrackerError::generation_failed(Some("prompt rejected")).to_string(),
            "prompt rejected"
        );
    }

    #[test]
    fn test_app_error_mapping() {
        assert_eq!(TrackerError::from(AppError::MissingCredential), TrackerError::Authentication);
        assert_eq!(
            TrackerError::from(AppError::Backend { status: 401, body: String::new() }),
            TrackerError::Authentication
        );
        assert!(matches!(
            TrackerError::from(AppError::Backend { status: 502, body: "bad gateway".into() }),
            TrackerError::Transport(msg) if msg.contains("502")
        ));
    }
}
