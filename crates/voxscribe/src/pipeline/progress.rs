//! Progress reporting from pipeline steps to interested consumers.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::job_progress::{JobPhase, JobProgressEvent};

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Phase { phase: JobPhase, message: String },
    Completed { result_path: String },
    Failed { error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Reporter that discards all events.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Reporter that forwards events for one task onto a broadcast channel.
pub struct BroadcastProgress {
    task_id: String,
    filename: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl BroadcastProgress {
    pub fn new(
        task_id: &str,
        filename: &str,
        sender: Arc<broadcast::Sender<JobProgressEvent>>,
    ) -> Self {
        Self {
            task_id: task_id.to_string(),
            filename: filename.to_string(),
            sender,
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        let event = match event {
            ProgressEvent::Phase { phase, message } => {
                JobProgressEvent::phase(&self.task_id, &self.filename, phase, message)
            }
            ProgressEvent::Completed { result_path } => {
                let mut e = JobProgressEvent::phase(
                    &self.task_id,
                    &self.filename,
                    JobPhase::Completed,
                    "Transcription completed".to_string(),
                );
                e.result_path = Some(result_path);
                e
            }
            ProgressEvent::Failed { error } => {
                let mut e = JobProgressEvent::phase(
                    &self.task_id,
                    &self.filename,
                    JobPhase::Failed,
                    "Transcription failed".to_string(),
                );
                e.error = Some(error);
                e
            }
        };

        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}
