//! Job repository — CRUD operations for the `jobs` table.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Row, ToSql};
use serde::{Deserialize, Serialize};

use super::transcript_repo::{self, NewTranscript};
use super::{Database, DatabaseError};

/// Lifecycle status of a transcription job.
///
/// Stored as lowercase strings. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProcess,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProcess => "in_process",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "in_process" => Some(JobStatus::InProcess),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for JobStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for JobStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        JobStatus::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub transcription_id: Option<i64>,
    pub result_path: String,
    /// Unix milliseconds.
    pub started_at: i64,
    /// Unix milliseconds.
    pub status_updated_at: i64,
    pub status: JobStatus,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            transcription_id: row.get("transcription_id")?,
            result_path: row.get("result_path")?,
            started_at: row.get("started_at")?,
            status_updated_at: row.get("status_updated_at")?,
            status: row.get("status")?,
        })
    }
}

/// Fields for a job row to be inserted. The id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub result_path: String,
    pub started_at: i64,
    pub status_updated_at: i64,
    pub status: JobStatus,
    pub transcription_id: Option<i64>,
}

impl NewJob {
    /// A new job record; status defaults to `Pending`.
    pub fn new(result_path: String, started_at: i64, status_updated_at: i64) -> Self {
        Self {
            result_path,
            started_at,
            status_updated_at,
            status: JobStatus::Pending,
            transcription_id: None,
        }
    }
}

/// Inserts a new job row and returns the store-assigned id.
pub fn insert(db: &Database, job: &NewJob) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| insert_with_conn(conn, job))
}

pub(crate) fn insert_with_conn(conn: &Connection, job: &NewJob) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (transcription_id, result_path, started_at, status_updated_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            job.transcription_id,
            job.result_path,
            job.started_at,
            job.status_updated_at,
            job.status,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds a job by its id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| find_by_id_with_conn(conn, id))
}

pub(crate) fn find_by_id_with_conn(
    conn: &Connection,
    id: i64,
) -> Result<Option<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// Updates an existing job row. All fields except `id` are overwritten.
pub fn update(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET transcription_id=?2, result_path=?3, started_at=?4,
             status_updated_at=?5, status=?6
             WHERE id=?1",
            params![
                job.id,
                job.transcription_id,
                job.result_path,
                job.started_at,
                job.status_updated_at,
                job.status,
            ],
        )?;
        Ok(())
    })
}

/// Updates only the status and status timestamp of a job.
pub fn update_status(
    db: &Database,
    id: i64,
    status: JobStatus,
    status_updated_at: i64,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET status = ?2, status_updated_at = ?3 WHERE id = ?1",
            params![id, status, status_updated_at],
        )?;
        Ok(())
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: JobStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Creates the transcript row and marks the referenced job `Completed` with
/// `transcription_id` pointing at it, all within one transaction.
///
/// If the job row does not exist, the transcript is still created and the
/// linking step is skipped; the returned job is `None` in that case.
pub fn create_transcript_and_link_job(
    db: &Database,
    job_id: i64,
    transcript: &NewTranscript,
) -> Result<(i64, Option<JobRow>), DatabaseError> {
    db.with_tx(|tx| {
        let transcript_id = transcript_repo::insert_with_conn(tx, transcript)?;

        let job = match find_by_id_with_conn(tx, job_id)? {
            Some(job) => job,
            None => {
                log::warn!(
                    "Job {} not found while linking transcript {}; transcript kept unlinked",
                    job_id,
                    transcript_id
                );
                return Ok((transcript_id, None));
            }
        };

        tx.execute(
            "UPDATE jobs SET transcription_id = ?2, status = ?3, status_updated_at = ?4
             WHERE id = ?1",
            params![
                job_id,
                transcript_id,
                JobStatus::Completed,
                transcript.transcribed_at,
            ],
        )?;

        let updated = JobRow {
            transcription_id: Some(transcript_id),
            status: JobStatus::Completed,
            status_updated_at: transcript.transcribed_at,
            ..job
        };
        Ok((transcript_id, Some(updated)))
    })
}
