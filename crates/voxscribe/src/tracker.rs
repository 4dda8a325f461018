//! Job status reconciliation on top of the job store.
//!
//! `JobTracker` owns the create-or-update semantics for job rows and the
//! atomic finalize operation that links a completed job to its transcript
//! record. It is the only component that mutates job rows.

use chrono::Utc;
use thiserror::Error;

use crate::db::job_repo::{self, JobRow, JobStatus, NewJob};
use crate::db::transcript_repo::NewTranscript;
use crate::db::{Database, DatabaseError};

/// Errors from job upserts.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Job {0} not found")]
    JobNotFound(i64),

    /// The job already reached a terminal status; no transition out of it
    /// is permitted. Re-upserting the same terminal status is allowed.
    #[error("Job {id} is already {status}")]
    Terminal { id: i64, status: JobStatus },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Error from `finalize_job`.
///
/// `primary` is the store failure that rolled back the create-and-link
/// transaction. `secondary` is the failure of the best-effort FAILED mark
/// that follows, if that attempt failed too — it is carried here instead of
/// being silently discarded, so callers and tests can observe that both
/// occurred.
#[derive(Error, Debug)]
#[error("Finalize failed: {primary}")]
pub struct FinalizeError {
    pub primary: DatabaseError,
    pub secondary: Option<DatabaseError>,
}

/// Create-or-update request for a job row.
///
/// With `job_id` set this is an update: `result_path`, `status` and the
/// status timestamp are overwritten unconditionally, `started_at` and
/// `transcription_id` only when supplied. Without `job_id` a new row is
/// inserted and `started_at` defaults to the current time.
#[derive(Debug, Clone)]
pub struct JobUpsert {
    pub result_path: String,
    pub status_updated_at: i64,
    pub status: JobStatus,
    pub started_at: Option<i64>,
    pub job_id: Option<i64>,
    pub transcription_id: Option<i64>,
}

impl JobUpsert {
    pub fn new(result_path: String, status_updated_at: i64, status: JobStatus) -> Self {
        Self {
            result_path,
            status_updated_at,
            status,
            started_at: None,
            job_id: None,
            transcription_id: None,
        }
    }
}

/// Reconciles job records against the store.
#[derive(Clone)]
pub struct JobTracker {
    db: Database,
}

impl JobTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates or updates a job row and returns its id.
    ///
    /// Idempotent with respect to `job_id`: repeating the same terminal
    /// upsert yields the same final state. Conflicting concurrent calls for
    /// the same job resolve last-write-wins; different jobs never interfere.
    pub fn upsert_job(&self, req: JobUpsert) -> Result<i64, TrackerError> {
        match req.job_id {
            Some(job_id) => {
                log::info!("Updating job {} to {}", job_id, req.status);
                let existing = job_repo::find_by_id(&self.db, job_id)?
                    .ok_or(TrackerError::JobNotFound(job_id))?;

                if existing.status.is_terminal() && existing.status != req.status {
                    return Err(TrackerError::Terminal {
                        id: job_id,
                        status: existing.status,
                    });
                }

                // Partial-update semantics: unspecified fields are preserved.
                let updated = JobRow {
                    id: job_id,
                    transcription_id: req.transcription_id.or(existing.transcription_id),
                    result_path: req.result_path,
                    started_at: req.started_at.unwrap_or(existing.started_at),
                    status_updated_at: req.status_updated_at,
                    status: req.status,
                };
                job_repo::update(&self.db, &updated)?;
                Ok(job_id)
            }
            None => {
                let job = NewJob {
                    result_path: req.result_path,
                    started_at: req.started_at.unwrap_or_else(now_millis),
                    status_updated_at: req.status_updated_at,
                    status: req.status,
                    transcription_id: req.transcription_id,
                };
                let id = job_repo::insert(&self.db, &job)?;
                log::info!("Created job {} with status {}", id, job.status);
                Ok(id)
            }
        }
    }

    /// Atomically creates the transcript record and marks the job completed.
    ///
    /// On store failure the transaction has already rolled back (no
    /// transcript, job unchanged); a best-effort secondary attempt then
    /// marks the job FAILED in a separate transaction. Between the rollback
    /// and that mark the job may transiently remain IN_PROCESS — an
    /// accepted consistency gap.
    pub fn finalize_job(
        &self,
        job_id: i64,
        transcript: NewTranscript,
    ) -> Result<i64, FinalizeError> {
        match job_repo::create_transcript_and_link_job(&self.db, job_id, &transcript) {
            Ok((transcript_id, _job)) => Ok(transcript_id),
            Err(primary) => {
                log::error!("Finalize of job {} failed: {}", job_id, primary);
                let secondary =
                    job_repo::update_status(&self.db, job_id, JobStatus::Failed, now_millis())
                        .err();
                if let Some(ref e) = secondary {
                    log::error!("Failed to mark job {} as failed: {}", job_id, e);
                }
                Err(FinalizeError { primary, secondary })
            }
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
