use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Transcription failed: {0}")]
    Transcribe(#[from] crate::error::TranscribeError),

    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Job tracking failed: {0}")]
    Tracker(#[from] crate::tracker::TrackerError),

    #[error("Finalize failed: {0}")]
    Finalize(#[from] crate::tracker::FinalizeError),
}
