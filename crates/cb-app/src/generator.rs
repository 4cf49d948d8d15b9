use std::sync::Arc;
use log::info;
use cb_core::GenerationRequest;
use crate::config::{AppConfig, TrackerConfig};
use crate::credentials::TokenStore;
use crate::error::AppError;
use crate::generator::backend::{GenerationApi, HttpGenerationApi};
use crate::generator::push::{PushChannel, SsePushChannel};
use crate::tracker::{ProgressTracker, TrackerHandle};

pub mod backend;
pub mod push;

/// Starts generations and hands back a tracker for each.
pub struct Generator {
    api: Arc<dyn GenerationApi>,
    tokens: Arc<dyn TokenStore>,
    tracker: ProgressTracker,
}

impl Generator {
    pub fn new(
        api: Arc<dyn GenerationApi>,
        push: Arc<dyn PushChannel>,
        tokens: Arc<dyn TokenStore>,
        config: TrackerConfig,
    ) -> Self {
        let tracker = ProgressTracker::new(Arc::clone(&api), push, Arc::clone(&tokens), config);
        Self { api, tokens, tracker }
    }

    /// HTTP backend and SSE push channel from configuration.
    pub fn from_config(config: &AppConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, AppError> {
        let api = HttpGenerationApi::new(&config.backend, Arc::clone(&tokens))?;
        let push = SsePushChannel::new(&config.backend)?;
        Ok(Self::new(Arc::new(api), Arc::new(push), tokens, config.tracker.clone()))
    }

    /// Create a job and start tracking it.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<TrackerHandle, AppError> {
        if self.tokens.retrieve_token().await.is_none() {
            return Err(AppError::MissingCredential);
        }

        let job_id = self.api.create_generation(request).await?;
        info!("Submitted {} generation as job {}", request.kind.name(), job_id);

        Ok(self.tracker.track(job_id))
    }

    /// Resume tracking a job created earlier.
    pub fn track(&self, job_id: impl Into<String>) -> TrackerHandle {
        self.tracker.track(job_id)
    }

    pub async fn delete_artifact(&self, artifact_id: &str) -> Result<(), AppError> {
        self.api.delete_artifact(artifact_id).await
    }
}
