//! Test harness for isolated end-to-end execution.
//!
//! `TestHarness` wires the full submission path — dispatcher, worker pool,
//! tracker and store — against temporary directories, a shared in-memory
//! database and an injectable speech engine.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_fs::TempDir;

use voxscribe::db::Database;
use voxscribe::error::TranscribeError;
use voxscribe::pipeline::PipelineConfig;
use voxscribe::transcriber::{SpeechEngine, SpeechEngineProvider};
use voxscribe::worker::{Dispatcher, TaskResult, Upload, WorkerPool};
use voxscribe::TranscriptionService;

/// Engine that returns the same text for every input.
pub struct FixedEngine(pub String);

impl SpeechEngine for FixedEngine {
    fn transcribe(&self, _audio: &Path) -> Result<String, TranscribeError> {
        Ok(self.0.clone())
    }
}

/// Provider handing out `FixedEngine`s.
pub struct FixedProvider(pub String);

impl SpeechEngineProvider for FixedProvider {
    fn acquire(&self) -> Result<Box<dyn SpeechEngine>, TranscribeError> {
        Ok(Box::new(FixedEngine(self.0.clone())))
    }

    fn is_ready(&self) -> bool {
        true
    }
}

/// Provider whose acquisition always fails, simulating a model that cannot
/// be initialized.
pub struct UnavailableProvider;

impl SpeechEngineProvider for UnavailableProvider {
    fn acquire(&self) -> Result<Box<dyn SpeechEngine>, TranscribeError> {
        Err(TranscribeError::CapabilityUnavailable(
            "model failed to initialize".to_string(),
        ))
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// Isolated service instance over temporary directories.
pub struct TestHarness {
    temp_dir: TempDir,
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    pub db: Database,
    pub pool: Arc<WorkerPool>,
    pub service: TranscriptionService,
}

impl TestHarness {
    /// Harness with a fixed-text engine.
    pub fn new() -> Self {
        Self::with_provider(Arc::new(FixedProvider("transcribed text".to_string())))
    }

    /// Harness with a caller-supplied engine provider.
    pub fn with_provider(engines: Arc<dyn SpeechEngineProvider>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let staging_dir = temp_dir.path().join("staging");
        let output_dir = temp_dir.path().join("output");
        std::fs::create_dir_all(&staging_dir).expect("Failed to create staging dir");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        let db = Database::open_in_memory().expect("Failed to open database");

        let config = Arc::new(PipelineConfig {
            staging_directory: staging_dir.clone(),
            output_directory: output_dir.clone(),
        });

        let pool = Arc::new(WorkerPool::new(
            Arc::clone(&config),
            db.clone(),
            Arc::clone(&engines),
            1,
        ));

        let dispatcher = Arc::new(
            Dispatcher::new(staging_dir.clone(), Arc::clone(&pool))
                .expect("Failed to create dispatcher"),
        );

        let service =
            TranscriptionService::new(db.clone(), dispatcher, Arc::clone(&pool), engines);

        Self {
            temp_dir,
            staging_dir,
            output_dir,
            db,
            pool,
            service,
        }
    }

    /// Builds an upload payload.
    pub fn upload(name: &str, bytes: &[u8]) -> Upload {
        Upload {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    /// Blocks until one task result is available.
    pub fn wait_for_result(&self) -> TaskResult {
        self.pool.recv_result().expect("Worker pool closed")
    }

    /// Path a staged upload would occupy.
    pub fn staged_path(&self, name: &str) -> PathBuf {
        self.staging_dir.join(name)
    }

    /// Path a completed transcript would occupy.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
