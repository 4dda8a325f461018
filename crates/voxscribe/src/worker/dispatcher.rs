//! Upload staging and task dispatch.
//!
//! `submit` persists each upload under its original name in the staging
//! directory and enqueues one task per input, returning handles without
//! waiting for any task to finish. Resubmitting the same name produces an
//! independent task; the last write to the staging path wins. Format
//! validation is deferred to the executor.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;
use walkdir::WalkDir;

use crate::error::{StorageError, WorkerError};
use crate::worker::pool::WorkerPool;
use crate::worker::task::TranscribeTask;

/// One uploaded file: original name plus payload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Handle returned per accepted upload.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTask {
    pub name: String,
    pub task_id: String,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Empty payload for upload '{0}'")]
    EmptyPayload(String),

    #[error("Staging failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Enqueue failed: {0}")]
    Worker(#[from] WorkerError),
}

pub struct Dispatcher {
    staging_directory: PathBuf,
    pool: Arc<WorkerPool>,
}

impl Dispatcher {
    pub fn new(
        staging_directory: PathBuf,
        pool: Arc<WorkerPool>,
    ) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&staging_directory).map_err(|e| {
            StorageError::CreateDirectory {
                path: staging_directory.clone(),
                source: e,
            }
        })?;
        Ok(Self {
            staging_directory,
            pool,
        })
    }

    /// Stages each upload and enqueues one task per input.
    ///
    /// Returns immediately with one handle per upload; completion is
    /// observed through the job store, not through this call.
    pub fn submit(&self, uploads: Vec<Upload>) -> Result<Vec<SubmittedTask>, DispatchError> {
        for upload in &uploads {
            if upload.bytes.is_empty() {
                return Err(DispatchError::EmptyPayload(upload.name.clone()));
            }
        }

        let mut submitted = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let staged_path = self.staging_directory.join(&upload.name);
            std::fs::write(&staged_path, &upload.bytes).map_err(|e| StorageError::WriteFile {
                path: staged_path.clone(),
                source: e,
            })?;

            let task = TranscribeTask::new(staged_path);
            debug!("Staged '{}' as task {}", upload.name, task.id);

            let task_id = task.id.clone();
            self.pool.submit(task)?;

            submitted.push(SubmittedTask {
                name: upload.name,
                task_id,
            });
        }

        info!("Dispatched {} transcription tasks", submitted.len());
        Ok(submitted)
    }

    /// Re-enqueues staged files left behind by a previous run.
    ///
    /// Only the top level of the staging directory is scanned. Returns the
    /// number of tasks enqueued.
    pub fn sweep_staging(&self) -> Result<usize, DispatchError> {
        let mut count = 0;

        for entry in WalkDir::new(&self.staging_directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }

            debug!("Found orphaned staged file: {}", path.display());
            self.pool.submit(TranscribeTask::new(path.to_path_buf()))?;
            count += 1;
        }

        if count > 0 {
            info!("Re-enqueued {} orphaned staged files", count);
        }
        Ok(count)
    }

    pub fn staging_directory(&self) -> &PathBuf {
        &self.staging_directory
    }
}
