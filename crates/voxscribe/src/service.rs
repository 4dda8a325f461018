//! Service facade consumed by whatever transport fronts the system.
//!
//! Wraps the dispatcher, worker pool and store behind the four operations
//! an embedding (HTTP handler, desktop shell, CLI) needs: submit uploads,
//! list transcripts, fetch one transcript's text, report health.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::db::transcript_repo::{self, TranscriptFilter, TranscriptRow};
use crate::db::{Database, DatabaseError};
use crate::transcriber::{is_supported_audio, SpeechEngineProvider};
use crate::worker::{DispatchError, Dispatcher, SubmittedTask, Upload, WorkerPool};

#[derive(Error, Debug)]
pub enum ServiceError {
    /// None of the submitted files carries a supported audio extension.
    #[error("No supported audio files in upload")]
    NoAudioFiles,

    #[error("Transcript '{0}' not found")]
    TranscriptNotFound(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Snapshot of subsystem readiness.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Speech model cached and usable.
    pub model_ready: bool,
    /// Worker threads accepting tasks.
    pub workers_alive: bool,
    /// Tasks currently waiting in the queue.
    pub queue_depth: usize,
}

pub struct TranscriptionService {
    db: Database,
    dispatcher: Arc<Dispatcher>,
    pool: Arc<WorkerPool>,
    engines: Arc<dyn SpeechEngineProvider>,
}

impl TranscriptionService {
    pub fn new(
        db: Database,
        dispatcher: Arc<Dispatcher>,
        pool: Arc<WorkerPool>,
        engines: Arc<dyn SpeechEngineProvider>,
    ) -> Self {
        Self {
            db,
            dispatcher,
            pool,
            engines,
        }
    }

    /// Stages the uploads and enqueues one task per file.
    ///
    /// Rejects the batch only when no file carries a supported audio
    /// extension; individual non-audio files in a mixed batch are still
    /// dispatched and fail at the executor's validation step.
    pub fn submit(&self, uploads: Vec<Upload>) -> Result<Vec<SubmittedTask>, ServiceError> {
        let any_audio = uploads
            .iter()
            .any(|u| is_supported_audio(Path::new(&u.name)));
        if !any_audio {
            return Err(ServiceError::NoAudioFiles);
        }

        Ok(self.dispatcher.submit(uploads)?)
    }

    /// Lists stored transcript records, newest first.
    pub fn list_transcripts(&self) -> Result<Vec<TranscriptRow>, ServiceError> {
        Ok(transcript_repo::query(&self.db, &TranscriptFilter::default())?)
    }

    /// Returns the stored transcript text for the given result file name.
    pub fn find_transcript_by_name(&self, name: &str) -> Result<String, ServiceError> {
        let rows = transcript_repo::query(
            &self.db,
            &TranscriptFilter {
                final_file_name: Some(name.to_string()),
                ..Default::default()
            },
        )?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::TranscriptNotFound(name.to_string()))?;

        // The record may outlive the file; a missing file is the same
        // not-found signal to the caller.
        std::fs::read_to_string(&row.result_path)
            .map_err(|_| ServiceError::TranscriptNotFound(name.to_string()))
    }

    /// Reports capability, worker and queue readiness.
    pub fn health(&self) -> HealthReport {
        HealthReport {
            model_ready: self.engines.is_ready(),
            workers_alive: !self.pool.is_shutdown(),
            queue_depth: self.pool.queue_len(),
        }
    }
}
