use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::sync::broadcast;

use crate::broadcast::job_progress::{JobPhase, JobProgressEvent};
use crate::db::Database;
use crate::pipeline::progress::{BroadcastProgress, NoopProgress, ProgressReporter};
use crate::pipeline::{Pipeline, PipelineConfig, ProgressEvent};
use crate::transcriber::SpeechEngineProvider;
use crate::worker::task::{TaskResult, TranscribeTask};

pub struct WorkerPool {
    task_sender: Sender<TranscribeTask>,
    result_receiver: Receiver<TaskResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// Optional job progress broadcaster for live status streaming.
    /// Stored to keep the sender alive; workers use cloned Arcs.
    #[allow(dead_code)]
    progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
}

impl WorkerPool {
    pub fn new(
        config: Arc<PipelineConfig>,
        db: Database,
        engines: Arc<dyn SpeechEngineProvider>,
        worker_count: usize,
    ) -> Self {
        Self::with_progress_sender(config, db, engines, worker_count, None)
    }

    /// Creates a new worker pool with an optional job progress broadcaster.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn with_progress_sender(
        config: Arc<PipelineConfig>,
        db: Database,
        engines: Arc<dyn SpeechEngineProvider>,
        worker_count: usize,
        progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
    ) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (task_sender, task_receiver) = bounded::<TranscribeTask>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<TaskResult>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let task_rx = task_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_config = Arc::clone(&config);
            let worker_db = db.clone();
            let worker_engines = Arc::clone(&engines);
            let worker_progress = progress_sender.clone();

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    task_rx,
                    result_tx,
                    shutdown_flag,
                    worker_config,
                    worker_db,
                    worker_engines,
                    worker_progress,
                );
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            task_sender,
            result_receiver,
            workers,
            shutdown,
            progress_sender,
        }
    }

    pub fn submit(&self, task: TranscribeTask) -> Result<(), crate::error::WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(crate::error::WorkerError::ChannelClosed);
        }

        self.task_sender
            .send(task)
            .map_err(|_| crate::error::WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<TaskResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<TaskResult> {
        self.result_receiver.recv().ok()
    }

    /// Number of tasks waiting in the queue (not yet picked up).
    pub fn queue_len(&self) -> usize {
        self.task_sender.len()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.task_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    worker_id: usize,
    task_receiver: Receiver<TranscribeTask>,
    result_sender: Sender<TaskResult>,
    shutdown: Arc<AtomicBool>,
    config: Arc<PipelineConfig>,
    db: Database,
    engines: Arc<dyn SpeechEngineProvider>,
    progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
) {
    debug!("Worker {} started", worker_id);

    let pipeline = Pipeline::new(config, db, engines);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match task_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(task) => {
                debug!("Worker {} processing task: {:?}", worker_id, task.staged_path);

                let result = if let Some(ref sender) = progress_sender {
                    let progress =
                        BroadcastProgress::new(&task.id, &task.file_name(), Arc::clone(sender));

                    progress.report(ProgressEvent::Phase {
                        phase: JobPhase::Queued,
                        message: "Task queued for transcription".to_string(),
                    });

                    let (result, _ctx) = pipeline.run(task, &progress);
                    result
                } else {
                    let (result, _ctx) = pipeline.run(task, &NoopProgress);
                    result
                };

                if let Err(e) = result_sender.send(result) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} task channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
