//! Command line surface of the `crayonbox` binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{info, warn};
use uuid::Uuid;
use cb_canvas::{CanvasState, ColoringCanvas};
use cb_core::{GenerationJob, GenerationKind, GenerationRequest, ProgressSnapshot};
use crate::config::AppConfig;
use crate::credentials::EnvTokenStore;
use crate::events::TrackerEvent;
use crate::generator::Generator;
use crate::image_fetch::{fetch_preview, HttpImageFetch};
use crate::tracker::TrackerHandle;

#[derive(Debug, Parser)]
#[command(name = "crayonbox", about = "Generate pictures and stories, then color them in", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a generation and follow it to the end.
    Generate {
        #[arg(long, default_value = "image")]
        kind: GenerationKind,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        category: Option<String>,
    },

    /// Follow a job that was started earlier.
    Track {
        job_id: String,
    },

    /// Render a coloring session over a background image.
    Color {
        /// Local path or http(s) URL.
        #[arg(long)]
        background: String,
        /// Saved strokes as JSON. Without it the bare page is written.
        #[arg(long)]
        strokes: Option<PathBuf>,
        /// Defaults to `coloring-<uuid>.png` in the working directory.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write the flattened export at double resolution.
        #[arg(long)]
        export: bool,
    },

    /// Delete one generated image.
    DeleteArtifact {
        artifact_id: String,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let tokens = Arc::new(EnvTokenStore::default());

    match cli.command {
        Command::Generate { kind, prompt, category } => {
            let generator = Generator::from_config(&config, tokens)?;
            let mut request = GenerationRequest::new(kind, prompt);
            if let Some(category) = category {
                request = request.with_category(category);
            }
            println!("{} Creating your {} (usually about {}s)", kind.icon(), kind.name(), kind.estimated_time_secs());
            let handle = generator.submit(&request).await?;
            follow(handle).await
        }
        Command::Track { job_id } => {
            let generator = Generator::from_config(&config, tokens)?;
            follow(generator.track(job_id)).await
        }
        Command::Color { background, strokes, out, export } => {
            let out = out.unwrap_or_else(default_output_path);
            color(&config, &background, strokes.as_deref(), &out, export).await
        }
        Command::DeleteArtifact { artifact_id } => {
            let generator = Generator::from_config(&config, tokens)?;
            generator.delete_artifact(&artifact_id).await?;
            println!("Deleted {artifact_id}");
            Ok(())
        }
    }
}

/// Print events until the terminal one. Ctrl-C cancels the session.
async fn follow(mut handle: TrackerHandle) -> anyhow::Result<()> {
    let started = Utc::now();

    loop {
        let event = tokio::select! {
            event = handle.next_event() => Some(event),
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!("ctrl-c handler failed: {}", err);
                }
                None
            }
        };

        let Some(event) = event else {
            info!("Tracking of {} cancelled by user", handle.job_id());
            handle.shutdown().await;
            println!("Stopped following the job. It keeps running on the server.");
            return Ok(());
        };

        let elapsed = (Utc::now() - started).num_seconds();
        match event {
            Some(TrackerEvent::Progress(snapshot)) => println!("{}", progress_line(&snapshot)),
            Some(TrackerEvent::Completed(job)) => {
                println!("Done in {elapsed}s!");
                print_artifacts(&job);
                return Ok(());
            }
            Some(TrackerEvent::Failed { job_id, error }) => {
                anyhow::bail!("job {job_id}: {error}");
            }
            None => anyhow::bail!("tracking ended without a result"),
        }
    }
}

pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    let percent = snapshot.display_percent();
    let filled = usize::from(percent / 5);
    format!(
        "{} [{}{}] {:>3}% {}",
        snapshot.status.icon(),
        "#".repeat(filled),
        ".".repeat(20 - filled),
        percent,
        snapshot.status,
    )
}

fn print_artifacts(job: &GenerationJob) {
    if job.images.is_empty() {
        println!("No images were returned for job {}", job.id);
    }
    for artifact in &job.images {
        println!("  {}  {}", artifact.id, artifact.url);
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from(format!("coloring-{}.png", Uuid::new_v4()))
}

async fn color(config: &AppConfig, background: &str, strokes: Option<&Path>, out: &Path, export: bool) -> anyhow::Result<()> {
    let client = reqwest::Client::builder().timeout(config.backend.http_timeout).build()?;
    let fetcher = HttpImageFetch::new(client);
    let preview = fetch_preview(&fetcher, background).await;
    if preview.is_placeholder() {
        println!("Background unavailable, using a blank page");
    }

    let state = match strokes {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading strokes from {}", path.display()))?;
            CanvasState::from_json(&json)?
        }
        None => CanvasState::default(),
    };

    let canvas = ColoringCanvas::new(preview.into_image())?.with_state(state);
    let png = if export {
        canvas.export_png()?
    } else {
        cb_canvas::encode_png(&canvas.render())?
    };

    tokio::fs::write(out, png)
        .await
        .with_context(|| format!("writing {}", out.display()))?;
    info!("Wrote coloring page with {} strokes to {} (export: {})", canvas.state().strokes().len(), out.display(), export);
    println!("Saved {}", out.display());
    Ok(())
}
