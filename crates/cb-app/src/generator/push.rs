//! Server-to-client status stream for a single job.
//!
//! The backend speaks server-sent events: each `data:` block carries one
//! JSON [`PushStatusEvent`]. Dropping or unsubscribing a
//! [`PushSubscription`] closes the underlying HTTP stream.

use std::collections::VecDeque;
use std::time::Duration;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::header::ACCEPT;
use crate::config::BackendConfig;
use crate::error::AppError;
use crate::generator::backend::ensure_success;
use crate::generator::backend::schemas::PushStatusEvent;

pub type PushStream = BoxStream<'static, Result<PushStatusEvent, AppError>>;

#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn subscribe(&self, job_id: &str, token: &str) -> Result<PushSubscription, AppError>;
}

/// A live subscription to one job's status events.
pub struct PushSubscription {
    job_id: String,
    stream: Option<PushStream>,
}

impl PushSubscription {
    pub fn new(job_id: impl Into<String>, stream: PushStream) -> Self {
        Self {
            job_id: job_id.into(),
            stream: Some(stream),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Next event for this job. Events for other jobs and malformed payloads
    /// are skipped. `None` once the stream ended or after unsubscribing.
    pub async fn next(&mut self) -> Option<Result<PushStatusEvent, AppError>> {
        loop {
            let stream = self.stream.as_mut()?;
            match stream.next().await {
                Some(Ok(event)) if event.job_id != self.job_id => {
                    debug!("Dropping push event for other job {}", event.job_id);
                }
                Some(Err(AppError::Decode(e))) => {
                    warn!("Skipping malformed push event: {}", e);
                }
                Some(item) => return Some(item),
                None => {
                    self.stream = None;
                    return None;
                }
            }
        }
    }

    /// Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.stream.take().is_some() {
            info!("Unsubscribed from push status for {}", self.job_id);
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Incremental `text/event-stream` parser yielding the `data` payload of
/// each dispatched event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    out.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // comments (":") and event/id/retry fields carry nothing we use
        }

        out
    }
}

pub struct SsePushChannel {
    client: reqwest::Client,
    push_url: String,
}

impl SsePushChannel {
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        // no overall timeout: the stream stays open for the whole job
        let client = reqwest::Client::builder()
            .connect_timeout(config.http_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            push_url: config.push_url.clone(),
        })
    }
}

#[async_trait]
impl PushChannel for SsePushChannel {
    async fn subscribe(&self, job_id: &str, token: &str) -> Result<PushSubscription, AppError> {
        let url = format!("{}/{}", self.push_url, job_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = ensure_success(response).await?;

        info!("Subscribed to push status for {}", job_id);

        let body = response.bytes_stream().boxed();
        let events = stream::unfold(
            (body, SseDecoder::default(), VecDeque::<String>::new()),
            |(mut body, mut decoder, mut pending)| async move {
                loop {
                    if let Some(data) = pending.pop_front() {
                        let item = serde_json::from_str::<PushStatusEvent>(&data).map_err(AppError::from);
                        return Some((item, (body, decoder, pending)));
                    }
                    match body.next().await {
                        Some(Ok(chunk)) => pending.extend(decoder.feed(&chunk)),
                        Some(Err(e)) => return Some((Err(AppError::Transport(e)), (body, decoder, pending))),
                        None => return None,
                    }
                }
            },
        );

        Ok(PushSubscription::new(job_id, events.boxed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::JobStatus;

    fn event(job_id: &str, status: JobStatus) -> PushStatusEvent {
        PushStatusEvent {
            job_id: job_id.into(),
            status,
            progress_percent: None,
            image_count: 0,
            error: None,
        }
    }

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: {\"a\":").is_empty());
        assert!(decoder.feed(b"1}\r\n").is_empty());
        assert_eq!(decoder.feed(b"\r\n"), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_decoder_ignores_comments_and_fields() {
        let mut decoder = SseDecoder::default();
        let out = decoder.feed(b": keepalive\n\nevent: status\nid: 7\ndata: one\ndata: two\n\ndata:three\n\n");
        assert_eq!(out, vec!["one\ntwo".to_string(), "three".to_string()]);
    }

    #[tokio::test]
    async fn test_subscription_filters_other_jobs_and_garbage() {
        let items: Vec<Result<PushStatusEvent, AppError>> = vec![
            Ok(event("other", JobStatus::Completed)),
            Err(AppError::Decode(serde_json::from_str::<PushStatusEvent>("{").unwrap_err())),
            Ok(event("job-1", JobStatus::Processing)),
        ];
        let mut sub = PushSubscription::new("job-1", stream::iter(items).boxed());

        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(first.status, JobStatus::Processing);
        assert!(sub.next().await.is_none());
        assert!(!sub.is_active());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let mut sub = PushSubscription::new("job-1", stream::pending().boxed());
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert!(sub.next().await.is_none());
    }
}
