use std::path::PathBuf;

use crate::worker::task::TranscribeTask;

pub struct JobContext {
    // Input
    pub task: TranscribeTask,

    // Step 1 result — guaranteed Some after step_reserve_path
    pub result_path: Option<PathBuf>,

    // Step 3 result — the store-assigned job id, Some once the IN_PROCESS
    // record exists
    pub job_id: Option<i64>,

    // Step 3 result — unix millis
    pub started_at: Option<i64>,

    // Step 6 result
    pub transcript_id: Option<i64>,

    // Whether a FAILED record was already written for the current error,
    // so the catch-all does not write a second one
    pub failure_recorded: bool,
}

impl JobContext {
    pub fn new(task: TranscribeTask) -> Self {
        Self {
            task,
            result_path: None,
            job_id: None,
            started_at: None,
            transcript_id: None,
            failure_recorded: false,
        }
    }
}
