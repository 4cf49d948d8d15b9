//! Progress tracking for one generation job.
//!
//! A tracking session listens to the push channel, makes one confirmatory
//! read shortly after starting, and arms a guard timer. If the guard
//! expires while the job still looks untouched (or the push channel is
//! unavailable) the session switches to bounded polling. Every sample, from
//! either source, goes through [`ProgressSnapshot::apply`], so the displayed
//! status never moves backwards.
//!
//! The whole session runs in one task whose every await sits under a single
//! [`CancellationToken`]; cancelling it stops the timers, the poll loop and
//! the push subscription together.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use log::{debug, info, warn};
use tracing::{info_span, Instrument};
use cb_core::{GenerationJob, JobStatus, ProgressSnapshot, SnapshotSource, Verdict};
use crate::config::TrackerConfig;
use crate::credentials::TokenStore;
use crate::error::TrackerError;
use crate::events::TrackerEvent;
use crate::generator::backend::schemas::PushStatusEvent;
use crate::generator::backend::GenerationApi;
use crate::generator::push::{PushChannel, PushSubscription};

/// Starts tracking sessions. Collaborators are injected, one set per screen.
#[derive(Clone)]
pub struct ProgressTracker {
    api: Arc<dyn GenerationApi>,
    push: Arc<dyn PushChannel>,
    tokens: Arc<dyn TokenStore>,
    config: TrackerConfig,
}

impl ProgressTracker {
    pub fn new(
        api: Arc<dyn GenerationApi>,
        push: Arc<dyn PushChannel>,
        tokens: Arc<dyn TokenStore>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            api,
            push,
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Spawn a tracking session for `job_id` on the current runtime.
    pub fn track(&self, job_id: impl Into<String>) -> TrackerHandle {
        let job_id = job_id.into();
        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let initial = ProgressSnapshot::initial(job_id.clone());
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.clone());

        let session = TrackingSession {
            job_id: job_id.clone(),
            api: Arc::clone(&self.api),
            push: Arc::clone(&self.push),
            tokens: Arc::clone(&self.tokens),
            config: self.config.clone(),
            snapshot: initial,
            subscription: None,
            events: events_tx,
            snapshot_tx,
            cancel: cancel.clone(),
        };

        let task = tokio::spawn(session.run().instrument(info_span!("progress_tracker", job_id = %job_id)));

        TrackerHandle {
            job_id,
            events: events_rx,
            snapshot: snapshot_rx,
            cancel,
            task: Some(task),
        }
    }
}

/// Owned by the screen that started tracking. Dropping it cancels the session.
pub struct TrackerHandle {
    job_id: String,
    events: mpsc::UnboundedReceiver<TrackerEvent>,
    snapshot: watch::Receiver<ProgressSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TrackerHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Next event, or `None` once the session finished or was cancelled.
    /// Nothing is delivered after [`cancel`](Self::cancel), even events
    /// already queued.
    pub async fn next_event(&mut self) -> Option<TrackerEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Drain events until the terminal one.
    pub async fn outcome(&mut self) -> Option<Result<GenerationJob, TrackerError>> {
        while let Some(event) = self.next_event().await {
            match event {
                TrackerEvent::Completed(job) => return Some(Ok(job)),
                TrackerEvent::Failed { error, .. } => return Some(Err(error)),
                TrackerEvent::Progress(_) => {}
            }
        }
        None
    }

    /// Latest displayed snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the session task to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Wake {
    Push(Option<Result<PushStatusEvent, crate::error::AppError>>),
    Confirm,
    Guard,
}

struct TrackingSession {
    job_id: String,
    api: Arc<dyn GenerationApi>,
    push: Arc<dyn PushChannel>,
    tokens: Arc<dyn TokenStore>,
    config: TrackerConfig,
    snapshot: ProgressSnapshot,
    subscription: Option<PushSubscription>,
    events: mpsc::UnboundedSender<TrackerEvent>,
    snapshot_tx: watch::Sender<ProgressSnapshot>,
    cancel: CancellationToken,
}

impl TrackingSession {
    async fn run(mut self) {
        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            outcome = self.drive() => Some(outcome),
        };

        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }

        match outcome {
            None => debug!("Tracking of {} cancelled", self.job_id),
            Some(Ok(job)) => {
                info!("Generation {} completed with {} images", self.job_id, job.images.len());
                self.emit(TrackerEvent::Completed(job));
            }
            Some(Err(error)) => {
                warn!("Generation {} failed: {}", self.job_id, error);
                self.emit(TrackerEvent::Failed {
                    job_id: self.job_id.clone(),
                    error,
                });
            }
        }
    }

    async fn drive(&mut self) -> Result<GenerationJob, TrackerError> {
        let Some(token) = self.tokens.retrieve_token().await else {
            return Err(TrackerError::Authentication);
        };

        self.emit(TrackerEvent::Progress(self.snapshot.clone()));

        match self.push.subscribe(&self.job_id, &token).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.listen().await;
            }
            Err(e) => warn!("Push subscribe for {} failed, falling back to polling: {}", self.job_id, e),
        }

        if !self.snapshot.is_terminal() {
            if let Some(mut subscription) = self.subscription.take() {
                subscription.unsubscribe();
            }
            self.poll().await?;
        }

        self.finish().await
    }

    /// Push phase. Returns when terminal, when the push channel is gone, or
    /// when the guard decides the channel has stalled.
    ///
    /// The guard is checked once. Once push progress passed the stall
    /// threshold, an open but silent channel keeps the session waiting with
    /// no time limit; cancelling the handle is the only way out.
    async fn listen(&mut self) {
        let confirm = sleep(self.config.confirm_delay);
        let guard = sleep(self.config.guard_timeout);
        tokio::pin!(confirm, guard);
        let mut confirmed = false;
        let mut guarded = false;

        while !self.snapshot.is_terminal() {
            let Some(subscription) = self.subscription.as_mut() else {
                return;
            };

            let wake = tokio::select! {
                event = subscription.next() => Wake::Push(event),
                () = &mut confirm, if !confirmed => Wake::Confirm,
                () = &mut guard, if !guarded => Wake::Guard,
            };

            match wake {
                Wake::Push(Some(Ok(event))) => self.offer(event.into_snapshot()),
                Wake::Push(Some(Err(e))) => {
                    warn!("Push channel for {} failed, switching to polling: {}", self.job_id, e);
                    return;
                }
                Wake::Push(None) => {
                    info!("Push channel for {} closed before a terminal status, switching to polling", self.job_id);
                    return;
                }
                Wake::Confirm => {
                    confirmed = true;
                    match self.api.get_job(&self.job_id).await {
                        Ok(job) => self.offer(ProgressSnapshot::from_job(&job, SnapshotSource::Poll)),
                        Err(e) => warn!("Confirmatory read of {} failed: {}", self.job_id, e),
                    }
                }
                Wake::Guard => {
                    guarded = true;
                    if self.looks_stalled() {
                        info!(
                            "No push progress for {} before guard timeout ({} at {}%), switching to polling",
                            self.job_id,
                            self.snapshot.status,
                            self.snapshot.display_percent()
                        );
                        return;
                    }
                }
            }
        }
    }

    fn looks_stalled(&self) -> bool {
        !self.snapshot.is_terminal() && self.snapshot.display_percent() <= self.config.stall_threshold
    }

    /// Polling phase, bounded by `poll_max_attempts`. Transport errors use up
    /// an attempt and are retried after the same interval.
    async fn poll(&mut self) -> Result<(), TrackerError> {
        let attempts = self.config.poll_max_attempts;

        for attempt in 1..=attempts {
            sleep(self.config.poll_interval).await;

            match self.api.get_job(&self.job_id).await {
                Ok(job) => {
                    self.offer(ProgressSnapshot::from_job(&job, SnapshotSource::Poll));
                    if self.snapshot.is_terminal() {
                        return Ok(());
                    }
                }
                Err(e) => warn!("Status poll {}/{} for {} failed: {}", attempt, attempts, self.job_id, e),
            }
        }

        Err(TrackerError::Timeout { attempts })
    }

    async fn finish(&mut self) -> Result<GenerationJob, TrackerError> {
        match self.snapshot.status {
            JobStatus::Completed => {
                let job = self.api.get_job(&self.job_id).await.map_err(TrackerError::from)?;
                sleep(self.config.completion_delay).await;
                Ok(job)
            }
            JobStatus::Failed => Err(TrackerError::generation_failed(self.snapshot.error_detail.as_deref())),
            status => Err(TrackerError::Transport(format!("tracking stopped while {status}"))),
        }
    }

    fn offer(&mut self, incoming: ProgressSnapshot) {
        let verdict = self.snapshot.apply(&incoming);
        match verdict {
            Verdict::Advanced | Verdict::Refreshed => {
                debug!(
                    "Accepted {:?} snapshot for {}: {} at {}%",
                    incoming.source,
                    self.job_id,
                    self.snapshot.status,
                    self.snapshot.display_percent()
                );
                self.snapshot_tx.send_replace(self.snapshot.clone());
                self.emit(TrackerEvent::Progress(self.snapshot.clone()));
            }
            Verdict::Rejected(reason) => {
                debug!("Ignored {:?} snapshot for {} ({}): {:?}", incoming.source, self.job_id, incoming.status, reason);
            }
        }
    }

    fn emit(&self, event: TrackerEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.events.send(event);
    }
}
