//! Job progress broadcasting for live status consumers.
//!
//! Workers publish phase transitions per task over a tokio broadcast
//! channel; any number of subscribers (UI, SSE bridge, tests) can follow
//! along. Lagging subscribers lose old events, they are never blocked on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Processing phase of a task as it moves through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Validating,
    Transcribing,
    Storing,
    Finalizing,
    Completed,
    Failed,
}

/// Coarse task outcome derived from the phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

/// A single progress event for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Queue task handle (not the store's job id).
    pub task_id: String,
    /// Original filename being transcribed.
    pub filename: String,
    pub phase: JobPhase,
    pub status: TaskStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    pub fn phase(task_id: &str, filename: &str, phase: JobPhase, message: String) -> Self {
        let status = match phase {
            JobPhase::Completed => TaskStatus::Completed,
            JobPhase::Failed => TaskStatus::Failed,
            _ => TaskStatus::Processing,
        };
        Self {
            task_id: task_id.to_string(),
            filename: filename.to_string(),
            phase,
            status,
            message,
            timestamp: Utc::now(),
            result_path: None,
            error: None,
        }
    }
}

/// Fan-out sender for job progress events.
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn sender(&self) -> Arc<broadcast::Sender<JobProgressEvent>> {
        Arc::clone(&self.sender)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: JobProgressEvent) {
        // A send error only means there are no subscribers right now.
        let _ = self.sender.send(event);
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
