pub mod schemas;

use std::sync::Arc;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{RequestBuilder, Response};
use cb_core::{GenerationJob, GenerationRequest};
use crate::config::BackendConfig;
use crate::credentials::TokenStore;
use crate::error::AppError;
use crate::generator::backend::schemas::JobCreateResponse;

/// Request/response side of the generation backend.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Starts a job and returns its server-assigned id.
    async fn create_generation(&self, request: &GenerationRequest) -> Result<String, AppError>;

    async fn get_job(&self, job_id: &str) -> Result<GenerationJob, AppError>;

    async fn delete_artifact(&self, artifact_id: &str) -> Result<(), AppError>;
}

pub struct HttpGenerationApi {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpGenerationApi {
    pub fn new(config: &BackendConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            tokens,
        })
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.retrieve_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response, AppError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Backend { status, body });
    }
    Ok(response)
}

#[async_trait]
impl GenerationApi for HttpGenerationApi {
    async fn create_generation(&self, request: &GenerationRequest) -> Result<String, AppError> {
        let url = format!("{}/generations", self.base_url);
        let response = self
            .authorized(self.client.post(url).json(request))
            .await
            .send()
            .await?;

        let created: JobCreateResponse = ensure_success(response).await?.json().await?;
        info!("Created {} generation {}", request.kind.id(), created.id);
        Ok(created.id)
    }

    async fn get_job(&self, job_id: &str) -> Result<GenerationJob, AppError> {
        let url = format!("{}/generations/{}", self.base_url, job_id);
        let response = self.authorized(self.client.get(url)).await.send().await?;

        let job: GenerationJob = ensure_success(response).await?.json().await?;
        debug!("Fetched job {} ({})", job.id, job.status);
        Ok(job)
    }

    async fn delete_artifact(&self, artifact_id: &str) -> Result<(), AppError> {
        let url = format!("{}/artifacts/{}", self.base_url, artifact_id);
        let response = self.authorized(self.client.delete(url)).await.send().await?;

        ensure_success(response).await?;
        info!("Deleted artifact {}", artifact_id);
        Ok(())
    }
}
