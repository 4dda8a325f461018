use std::sync::Arc;

use tracing::info_span;

use crate::broadcast::job_progress::JobPhase;
use crate::db::job_repo::JobStatus;
use crate::db::transcript_repo::NewTranscript;
use crate::db::Database;
use crate::error::{StorageError, TranscribeError};
use crate::sanitize;
use crate::tracker::{now_millis, JobTracker, JobUpsert};
use crate::transcriber::{self, SpeechEngineProvider};
use crate::worker::task::{TaskResult, TranscribeTask};

use super::config::PipelineConfig;
use super::context::JobContext;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};

/// Per-task executor: drives one transcription job from staged input to a
/// terminal status. All steps block; one task runs entirely on one worker.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    tracker: JobTracker,
    engines: Arc<dyn SpeechEngineProvider>,
}

impl Pipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        db: Database,
        engines: Arc<dyn SpeechEngineProvider>,
    ) -> Self {
        Self {
            config,
            tracker: JobTracker::new(db),
            engines,
        }
    }

    /// Runs the full state machine for a single task.
    /// Returns a (TaskResult, JobContext) pair.
    pub fn run(
        &self,
        task: TranscribeTask,
        progress: &dyn ProgressReporter,
    ) -> (TaskResult, JobContext) {
        let filename = sanitize::redact_path(&task.staged_path);
        let _pipeline_span = info_span!("pipeline",
            task_id = %task.id,
            filename = %filename,
        )
        .entered();

        let mut ctx = JobContext::new(task);
        let outcome = self.run_steps(&mut ctx, progress);

        // The staged input is released on every exit path; a deletion
        // failure must not mask the job's actual outcome.
        self.remove_staged(&ctx);

        match outcome {
            Ok(()) => {
                let result_path = ctx.result_path.clone().expect("result path set in step 1");
                progress.report(ProgressEvent::Completed {
                    result_path: result_path.display().to_string(),
                });
                let result = TaskResult::success(
                    &ctx.task,
                    ctx.job_id.expect("job id set in step 3"),
                    ctx.transcript_id.expect("transcript id set in step 6"),
                    result_path,
                );
                (result, ctx)
            }
            Err(e) => {
                let err_msg = e.to_string();
                if !ctx.failure_recorded {
                    self.record_failure(&mut ctx);
                }
                progress.report(ProgressEvent::Failed {
                    error: err_msg.clone(),
                });
                let result = TaskResult::failure(&ctx.task, ctx.job_id, err_msg);
                (result, ctx)
            }
        }
    }

    fn run_steps(
        &self,
        ctx: &mut JobContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        // Step 1: Reserve the output location
        self.step_reserve_path(ctx);

        // Step 2: Validate the input format
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Validating,
            message: "Validating audio format...".to_string(),
        });
        self.step_validate(ctx)?;

        // Step 3: First durable trace of the job
        self.step_record_started(ctx)?;

        // Steps 4+5: Acquire the engine and transcribe
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Transcribing,
            message: "Running speech recognition...".to_string(),
        });
        let text = self.step_transcribe(ctx)?;

        // Step 5: Persist the transcript text
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Storing,
            message: "Writing transcript...".to_string(),
        });
        self.step_store(ctx, &text)?;

        // Step 6: Link job and transcript atomically
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Finalizing,
            message: "Finalizing job record...".to_string(),
        });
        self.step_finalize(ctx)?;

        Ok(())
    }

    fn step_reserve_path(&self, ctx: &mut JobContext) {
        // The transcript keeps the input's base name under the output
        // directory; reserved once, stable for the job's lifetime.
        let reserved = self.config.output_directory.join(ctx.task.file_name());
        ctx.result_path = Some(reserved);
    }

    fn step_validate(&self, ctx: &JobContext) -> Result<(), PipelineError> {
        if !transcriber::is_supported_audio(&ctx.task.staged_path) {
            return Err(TranscribeError::UnsupportedFormat(ctx.task.file_name()).into());
        }
        Ok(())
    }

    fn step_record_started(&self, ctx: &mut JobContext) -> Result<(), PipelineError> {
        let started = now_millis();
        let result_path = ctx.result_path.as_ref().expect("step 1 completed");

        let mut upsert = JobUpsert::new(
            result_path.display().to_string(),
            started,
            JobStatus::InProcess,
        );
        upsert.started_at = Some(started);

        let job_id = self.tracker.upsert_job(upsert)?;
        ctx.job_id = Some(job_id);
        ctx.started_at = Some(started);
        Ok(())
    }

    fn step_transcribe(&self, ctx: &mut JobContext) -> Result<String, PipelineError> {
        let engine = match self.engines.acquire() {
            Ok(engine) => engine,
            Err(e) => {
                // Terminal: record the failure on the known job before
                // surfacing it. No retry.
                self.record_failure(ctx);
                return Err(e.into());
            }
        };

        let text = engine.transcribe(&ctx.task.staged_path)?;
        Ok(text)
    }

    fn step_store(&self, ctx: &JobContext, text: &str) -> Result<(), PipelineError> {
        let result_path = ctx.result_path.as_ref().expect("step 1 completed");

        std::fs::create_dir_all(&self.config.output_directory).map_err(|e| {
            StorageError::CreateDirectory {
                path: self.config.output_directory.clone(),
                source: e,
            }
        })?;
        std::fs::write(result_path, text).map_err(|e| StorageError::WriteFile {
            path: result_path.clone(),
            source: e,
        })?;
        Ok(())
    }

    fn step_finalize(&self, ctx: &mut JobContext) -> Result<(), PipelineError> {
        let job_id = ctx.job_id.expect("step 3 completed");
        let result_path = ctx.result_path.as_ref().expect("step 1 completed");
        let file_name = ctx.task.file_name();

        let transcript = NewTranscript {
            source_file_name: file_name.clone(),
            final_file_name: file_name,
            result_path: result_path.display().to_string(),
            uploaded_at: ctx.started_at.expect("step 3 completed"),
            transcribed_at: now_millis(),
        };

        match self.tracker.finalize_job(job_id, transcript) {
            Ok(transcript_id) => {
                ctx.transcript_id = Some(transcript_id);
                Ok(())
            }
            Err(e) => {
                // The tracker already attempted the secondary FAILED mark.
                ctx.failure_recorded = true;
                Err(e.into())
            }
        }
    }

    /// Writes a FAILED record for the current task. When no job id exists
    /// yet (e.g. validation failed) this creates a fresh FAILED row.
    fn record_failure(&self, ctx: &mut JobContext) {
        let now = now_millis();
        let result_path = ctx
            .result_path
            .clone()
            .unwrap_or_else(|| self.config.output_directory.join(ctx.task.file_name()));

        let upsert = JobUpsert {
            result_path: result_path.display().to_string(),
            status_updated_at: now,
            status: JobStatus::Failed,
            started_at: ctx.started_at,
            job_id: ctx.job_id,
            transcription_id: None,
        };

        match self.tracker.upsert_job(upsert) {
            Ok(job_id) => {
                ctx.job_id = Some(job_id);
                ctx.failure_recorded = true;
            }
            Err(e) => {
                // The original task error stays primary; a store error here
                // must not mask it.
                log::error!(
                    "Failed to record FAILED status for task {}: {}",
                    ctx.task.id,
                    e
                );
            }
        }
    }

    fn remove_staged(&self, ctx: &JobContext) {
        let staged = &ctx.task.staged_path;
        if !staged.exists() {
            return;
        }
        match std::fs::remove_file(staged) {
            Ok(()) => log::info!("Removed staged file: {}", staged.display()),
            Err(e) => log::error!("Failed to remove staged file {}: {}", staged.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{job_repo, transcript_repo};
    use crate::pipeline::progress::NoopProgress;
    use crate::transcriber::SpeechEngine;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct FixedEngine(String);

    impl SpeechEngine for FixedEngine {
        fn transcribe(&self, _audio: &Path) -> Result<String, TranscribeError> {
            Ok(self.0.clone())
        }
    }

    struct FixedProvider(String);

    impl SpeechEngineProvider for FixedProvider {
        fn acquire(&self) -> Result<Box<dyn SpeechEngine>, TranscribeError> {
            Ok(Box::new(FixedEngine(self.0.clone())))
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    struct UnavailableProvider;

    impl SpeechEngineProvider for UnavailableProvider {
        fn acquire(&self) -> Result<Box<dyn SpeechEngine>, TranscribeError> {
            Err(TranscribeError::CapabilityUnavailable(
                "model failed to initialize".to_string(),
            ))
        }

        fn is_ready(&self) -> bool {
            false
        }
    }

    struct BrokenEngineProvider;

    impl SpeechEngineProvider for BrokenEngineProvider {
        fn acquire(&self) -> Result<Box<dyn SpeechEngine>, TranscribeError> {
            struct Broken;
            impl SpeechEngine for Broken {
                fn transcribe(&self, _audio: &Path) -> Result<String, TranscribeError> {
                    Err(TranscribeError::Invocation("decode error".to_string()))
                }
            }
            Ok(Box::new(Broken))
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    struct Setup {
        _temp: TempDir,
        staging_dir: PathBuf,
        output_dir: PathBuf,
        db: Database,
    }

    impl Setup {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let staging_dir = temp.path().join("staging");
            let output_dir = temp.path().join("output");
            std::fs::create_dir_all(&staging_dir).unwrap();
            std::fs::create_dir_all(&output_dir).unwrap();
            Self {
                _temp: temp,
                staging_dir,
                output_dir,
                db: Database::open_in_memory().unwrap(),
            }
        }

        fn pipeline(&self, engines: Arc<dyn SpeechEngineProvider>) -> Pipeline {
            let config = Arc::new(PipelineConfig {
                staging_directory: self.staging_dir.clone(),
                output_directory: self.output_dir.clone(),
            });
            Pipeline::new(config, self.db.clone(), engines)
        }

        fn stage(&self, name: &str) -> TranscribeTask {
            let path = self.staging_dir.join(name);
            std::fs::write(&path, b"fake audio bytes").unwrap();
            TranscribeTask::new(path)
        }
    }

    #[test]
    fn test_successful_run_completes_job() {
        let setup = Setup::new();
        let pipeline = setup.pipeline(Arc::new(FixedProvider("hello world".to_string())));
        let task = setup.stage("voice.mp3");
        let staged = task.staged_path.clone();

        let (result, ctx) = pipeline.run(task, &NoopProgress);

        assert!(result.success, "run failed: {:?}", result.error);
        let job_id = result.job_id.unwrap();
        let job = job_repo::find_by_id(&setup.db, job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.transcription_id, result.transcript_id);

        // Transcript text landed at the reserved path.
        let result_path = ctx.result_path.unwrap();
        assert_eq!(result_path, setup.output_dir.join("voice.mp3"));
        assert_eq!(std::fs::read_to_string(&result_path).unwrap(), "hello world");

        // Staged input released.
        assert!(!staged.exists());
    }

    #[test]
    fn test_unsupported_format_fails_without_in_process_record() {
        let setup = Setup::new();
        let pipeline = setup.pipeline(Arc::new(FixedProvider("unused".to_string())));
        let task = setup.stage("notes.txt");
        let staged = task.staged_path.clone();

        let (result, _ctx) = pipeline.run(task, &NoopProgress);

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unsupported audio format"));

        // The fallback created a fresh FAILED row; nothing ever reached
        // IN_PROCESS.
        assert_eq!(
            job_repo::count_by_status(&setup.db, JobStatus::Failed).unwrap(),
            1
        );
        assert_eq!(
            job_repo::count_by_status(&setup.db, JobStatus::InProcess).unwrap(),
            0
        );
        assert!(
            transcript_repo::query(&setup.db, &Default::default())
                .unwrap()
                .is_empty()
        );
        assert!(!staged.exists());
    }

    #[test]
    fn test_unavailable_engine_marks_started_job_failed() {
        let setup = Setup::new();
        let pipeline = setup.pipeline(Arc::new(UnavailableProvider));
        let task = setup.stage("voice.mp3");
        let staged = task.staged_path.clone();

        let (result, _ctx) = pipeline.run(task, &NoopProgress);

        assert!(!result.success);
        assert!(result.error.unwrap().contains("unavailable"));

        // The IN_PROCESS record from step 3 was moved to FAILED, no second
        // row was created.
        let job_id = result.job_id.unwrap();
        let job = job_repo::find_by_id(&setup.db, job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job_repo::count_by_status(&setup.db, JobStatus::Failed).unwrap(),
            1
        );
        assert!(!staged.exists());
    }

    #[test]
    fn test_invocation_failure_marks_job_failed() {
        let setup = Setup::new();
        let pipeline = setup.pipeline(Arc::new(BrokenEngineProvider));
        let task = setup.stage("voice.mp3");

        let (result, _ctx) = pipeline.run(task, &NoopProgress);

        assert!(!result.success);
        let job = job_repo::find_by_id(&setup.db, result.job_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(
            transcript_repo::query(&setup.db, &Default::default())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_result_path_is_reserved_from_base_name() {
        let setup = Setup::new();
        let pipeline = setup.pipeline(Arc::new(FixedProvider("text".to_string())));
        let task = setup.stage("Meeting Notes.m4a");

        let (result, _ctx) = pipeline.run(task, &NoopProgress);

        assert!(result.success);
        assert_eq!(
            result.result_path.unwrap(),
            setup.output_dir.join("Meeting Notes.m4a")
        );
    }

    #[test]
    fn test_staged_file_already_gone_is_not_an_error() {
        let setup = Setup::new();
        let pipeline = setup.pipeline(Arc::new(FixedProvider("text".to_string())));
        let task = setup.stage("voice.mp3");
        std::fs::remove_file(&task.staged_path).unwrap();

        // Engine still "reads" it (FixedEngine ignores the path); cleanup
        // must tolerate the missing file.
        let (result, _ctx) = pipeline.run(task, &NoopProgress);
        assert!(result.success);
    }
}
