pub mod dispatcher;
pub mod pool;
pub mod task;

pub use dispatcher::{DispatchError, Dispatcher, SubmittedTask, Upload};
pub use pool::WorkerPool;
pub use task::{TaskResult, TranscribeTask};

// Re-export crossbeam_channel for embedders wiring their own result loop
pub use crossbeam_channel;
