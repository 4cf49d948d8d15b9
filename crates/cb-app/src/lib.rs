pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod generator;
pub mod image_fetch;
pub mod tracker;

pub use config::{AppConfig, BackendConfig, TrackerConfig};
pub use error::{AppError, TrackerError};
pub use events::TrackerEvent;
pub use generator::Generator;
pub use tracker::{ProgressTracker, TrackerHandle};
