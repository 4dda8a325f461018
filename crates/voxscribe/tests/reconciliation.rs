//! Status reconciliation properties: upsert idempotency, terminal-state
//! immutability, and all-or-nothing finalize under simulated store failure.

use voxscribe::db::job_repo::{self, JobStatus};
use voxscribe::db::transcript_repo::{self, NewTranscript, TranscriptFilter};
use voxscribe::db::Database;
use voxscribe::{JobTracker, JobUpsert, TrackerError};

fn setup() -> (JobTracker, Database) {
    let db = Database::open_in_memory().unwrap();
    (JobTracker::new(db.clone()), db)
}

fn in_process(result_path: &str) -> JobUpsert {
    let mut req = JobUpsert::new(result_path.to_string(), 1_000, JobStatus::InProcess);
    req.started_at = Some(1_000);
    req
}

fn transcript(name: &str) -> NewTranscript {
    NewTranscript {
        source_file_name: name.to_string(),
        final_file_name: name.to_string(),
        result_path: format!("/out/{}", name),
        uploaded_at: 1_000,
        transcribed_at: 2_000,
    }
}

#[test]
fn test_upsert_without_id_always_creates_fresh_rows() {
    let (tracker, _db) = setup();

    let first = tracker.upsert_job(in_process("/out/a.mp3")).unwrap();
    let second = tracker.upsert_job(in_process("/out/a.mp3")).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_upsert_preserves_unspecified_fields() {
    let (tracker, db) = setup();
    let id = tracker.upsert_job(in_process("/out/a.mp3")).unwrap();

    // Move to FAILED without supplying started_at or transcription_id.
    let mut req = JobUpsert::new("/out/a.mp3".to_string(), 5_000, JobStatus::Failed);
    req.job_id = Some(id);
    tracker.upsert_job(req).unwrap();

    let job = job_repo::find_by_id(&db, id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.status_updated_at, 5_000);
    assert_eq!(job.started_at, 1_000);
    assert!(job.transcription_id.is_none());
}

#[test]
fn test_upsert_unknown_id_fails_and_writes_nothing() {
    let (tracker, db) = setup();

    let mut req = in_process("/out/a.mp3");
    req.job_id = Some(77);
    assert!(matches!(
        tracker.upsert_job(req),
        Err(TrackerError::JobNotFound(77))
    ));

    assert_eq!(job_repo::count_by_status(&db, JobStatus::InProcess).unwrap(), 0);
    assert_eq!(job_repo::count_by_status(&db, JobStatus::Failed).unwrap(), 0);
}

#[test]
fn test_no_transition_out_of_completed() {
    let (tracker, db) = setup();
    let id = tracker.upsert_job(in_process("/out/a.mp3")).unwrap();
    tracker.finalize_job(id, transcript("a.mp3")).unwrap();

    for status in [JobStatus::Pending, JobStatus::InProcess, JobStatus::Failed] {
        let mut req = JobUpsert::new("/out/a.mp3".to_string(), 9_000, status);
        req.job_id = Some(id);
        assert!(
            matches!(tracker.upsert_job(req), Err(TrackerError::Terminal { .. })),
            "transition out of completed to {} was allowed",
            status
        );
    }

    let job = job_repo::find_by_id(&db, id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[test]
fn test_no_transition_out_of_failed() {
    let (tracker, db) = setup();
    let id = tracker.upsert_job(in_process("/out/a.mp3")).unwrap();

    let mut fail = JobUpsert::new("/out/a.mp3".to_string(), 2_000, JobStatus::Failed);
    fail.job_id = Some(id);
    tracker.upsert_job(fail).unwrap();

    let mut revive = JobUpsert::new("/out/a.mp3".to_string(), 3_000, JobStatus::InProcess);
    revive.job_id = Some(id);
    assert!(matches!(
        tracker.upsert_job(revive),
        Err(TrackerError::Terminal { .. })
    ));

    let job = job_repo::find_by_id(&db, id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

#[test]
fn test_finalize_sets_link_and_status_atomically() {
    let (tracker, db) = setup();
    let id = tracker.upsert_job(in_process("/out/a.mp3")).unwrap();

    let transcript_id = tracker.finalize_job(id, transcript("a.mp3")).unwrap();

    let job = job_repo::find_by_id(&db, id).unwrap().unwrap();
    // transcription_id is non-null iff status is COMPLETED; both were set
    // in the same transaction.
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.transcription_id, Some(transcript_id));
    assert_eq!(job.status_updated_at, 2_000);

    let row = transcript_repo::find_by_id(&db, transcript_id)
        .unwrap()
        .unwrap();
    assert_eq!(row.final_file_name, "a.mp3");
    assert_eq!(row.uploaded_at, 1_000);
}

#[test]
fn test_finalize_is_all_or_nothing_under_store_failure() {
    let (tracker, db) = setup();
    let id = tracker.upsert_job(in_process("/out/a.mp3")).unwrap();

    // Make every transcript insert abort inside the transaction.
    db.with_conn(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER transcripts_fail BEFORE INSERT ON transcripts
             BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END;",
        )?;
        Ok(())
    })
    .unwrap();

    let err = tracker.finalize_job(id, transcript("a.mp3")).unwrap_err();
    assert!(err.secondary.is_none(), "secondary mark should have worked");

    // Never COMPLETED with a missing transcript: the job resolved to
    // FAILED via the secondary attempt.
    let job = job_repo::find_by_id(&db, id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.transcription_id.is_none());

    // And never a transcript without its linked COMPLETED job.
    db.with_conn(|conn| {
        conn.execute_batch("DROP TRIGGER transcripts_fail")?;
        Ok(())
    })
    .unwrap();
    assert!(transcript_repo::query(&db, &TranscriptFilter::default())
        .unwrap()
        .is_empty());
}

#[test]
fn test_finalize_with_missing_job_keeps_transcript_unlinked() {
    let (tracker, db) = setup();

    // Preserved source behavior: the transcript is still created when the
    // job row is absent; linking is skipped.
    let transcript_id = tracker.finalize_job(404, transcript("ghost.mp3")).unwrap();

    assert!(transcript_repo::find_by_id(&db, transcript_id)
        .unwrap()
        .is_some());
    assert_eq!(job_repo::count_by_status(&db, JobStatus::Completed).unwrap(), 0);
}
