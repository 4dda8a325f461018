pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod sanitize;
pub mod service;
pub mod tracker;
pub mod transcriber;
pub mod worker;

pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, Config, ModelConfig};
pub use error::{
    ConfigError, Result, StorageError, TranscribeError, VoxscribeError, WorkerError,
};
pub use pipeline::{Pipeline, PipelineConfig};
pub use service::{HealthReport, ServiceError, TranscriptionService};
pub use tracker::{FinalizeError, JobTracker, JobUpsert, TrackerError};
pub use transcriber::{SpeechEngine, SpeechEngineProvider};
pub use worker::{Dispatcher, TranscribeTask, Upload, WorkerPool};
