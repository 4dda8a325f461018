//! Transcript repository — operations for the `transcripts` table.
//!
//! Transcript rows are written once (by the job-linking transaction in
//! `job_repo`) and never mutated afterwards.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{Database, DatabaseError};

/// A completed transcription artifact record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRow {
    pub id: i64,
    pub source_file_name: String,
    pub final_file_name: String,
    pub result_path: String,
    /// Unix milliseconds.
    pub uploaded_at: i64,
    /// Unix milliseconds.
    pub transcribed_at: i64,
}

impl TranscriptRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            source_file_name: row.get("source_file_name")?,
            final_file_name: row.get("final_file_name")?,
            result_path: row.get("result_path")?,
            uploaded_at: row.get("uploaded_at")?,
            transcribed_at: row.get("transcribed_at")?,
        })
    }
}

/// Fields for a transcript row to be inserted.
#[derive(Debug, Clone)]
pub struct NewTranscript {
    pub source_file_name: String,
    pub final_file_name: String,
    pub result_path: String,
    pub uploaded_at: i64,
    pub transcribed_at: i64,
}

/// Query filter parameters for transcript listing.
#[derive(Debug, Default, Clone)]
pub struct TranscriptFilter {
    pub final_file_name: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new transcript row and returns the store-assigned id.
pub fn insert(db: &Database, transcript: &NewTranscript) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| insert_with_conn(conn, transcript))
}

pub(crate) fn insert_with_conn(
    conn: &Connection,
    transcript: &NewTranscript,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO transcripts (source_file_name, final_file_name, result_path,
         uploaded_at, transcribed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            transcript.source_file_name,
            transcript.final_file_name,
            transcript.result_path,
            transcript.uploaded_at,
            transcript.transcribed_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds a transcript by its id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<TranscriptRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM transcripts WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], TranscriptRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Queries transcripts, optionally filtered by `final_file_name`.
pub fn query(db: &Database, filter: &TranscriptFilter) -> Result<Vec<TranscriptRow>, DatabaseError> {
    db.with_conn(|conn| {
        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;

        let rows = if let Some(ref name) = filter.final_file_name {
            let mut stmt = conn.prepare(
                "SELECT * FROM transcripts WHERE final_file_name = ?1
                 ORDER BY transcribed_at DESC LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(params![name, limit, offset], TranscriptRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(
                "SELECT * FROM transcripts ORDER BY transcribed_at DESC LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit, offset], TranscriptRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Ok(rows)
    })
}
