use std::path::{Path, PathBuf};

/// One unit of transcription work pulled from the queue.
///
/// `id` is the queue handle returned to submitters; the store-assigned job
/// id does not exist until the executor writes the first durable record.
#[derive(Debug, Clone)]
pub struct TranscribeTask {
    pub id: String,
    /// Staged copy of the uploaded audio, deleted when the task finishes.
    pub staged_path: PathBuf,
    /// MIME type guessed from the staged file name.
    pub mime_type: Option<String>,
}

impl TranscribeTask {
    pub fn new(staged_path: PathBuf) -> Self {
        let mime_type = Self::detect_mime_type(&staged_path);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            staged_path,
            mime_type,
        }
    }

    /// Base name of the staged file (the original upload name).
    pub fn file_name(&self) -> String {
        self.staged_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Detects MIME type from the file path using the mime_guess crate.
    /// Returns `None` for unknown extensions.
    fn detect_mime_type(path: &Path) -> Option<String> {
        mime_guess::from_path(path).first().map(|m| m.to_string())
    }
}

/// Outcome of one executed task, sent back over the result channel.
#[derive(Debug)]
pub struct TaskResult {
    pub task_id: String,
    pub staged_path: PathBuf,
    pub success: bool,
    /// Store-assigned job id, if the executor got far enough to create one.
    pub job_id: Option<i64>,
    pub transcript_id: Option<i64>,
    pub result_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(
        task: &TranscribeTask,
        job_id: i64,
        transcript_id: i64,
        result_path: PathBuf,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            staged_path: task.staged_path.clone(),
            success: true,
            job_id: Some(job_id),
            transcript_id: Some(transcript_id),
            result_path: Some(result_path),
            error: None,
        }
    }

    pub fn failure(task: &TranscribeTask, job_id: Option<i64>, error: String) -> Self {
        Self {
            task_id: task.id.clone(),
            staged_path: task.staged_path.clone(),
            success: false,
            job_id,
            transcript_id: None,
            result_path: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = TranscribeTask::new(PathBuf::from("/staging/voice.mp3"));
        assert!(!task.id.is_empty());
        assert_eq!(task.file_name(), "voice.mp3");
        assert_eq!(task.mime_type, Some("audio/mpeg".to_string()));
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = TranscribeTask::new(PathBuf::from("/staging/voice.mp3"));
        let b = TranscribeTask::new(PathBuf::from("/staging/voice.mp3"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_mime_type_detection() {
        // Exact wav mapping differs across mime tables (audio/wav vs
        // audio/x-wav); only the audio family is load-bearing here.
        let task = TranscribeTask::new(PathBuf::from("a.wav"));
        assert!(task.mime_type.unwrap().starts_with("audio/"));

        let task = TranscribeTask::new(PathBuf::from("a.xyz123"));
        assert!(task.mime_type.is_none());
    }

    #[test]
    fn test_result_success() {
        let task = TranscribeTask::new(PathBuf::from("/staging/voice.mp3"));
        let result = TaskResult::success(&task, 7, 3, PathBuf::from("/out/voice.mp3"));

        assert!(result.success);
        assert_eq!(result.task_id, task.id);
        assert_eq!(result.job_id, Some(7));
        assert_eq!(result.transcript_id, Some(3));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_result_failure() {
        let task = TranscribeTask::new(PathBuf::from("/staging/voice.mp3"));
        let result = TaskResult::failure(&task, None, "engine unavailable".to_string());

        assert!(!result.success);
        assert!(result.job_id.is_none());
        assert!(result.result_path.is_none());
        assert_eq!(result.error.as_deref(), Some("engine unavailable"));
    }
}
