//! Speech-to-text capability.
//!
//! The engine is opaque to the rest of the system: a single blocking call
//! from an audio file to text. Acquisition may fail (missing model, build
//! without the `whisper` feature) independently of invocation.

use std::path::Path;
use std::sync::Arc;

pub mod model_manager;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use model_manager::ModelManager;

use crate::config::schema::ModelConfig;
use crate::error::TranscribeError;

/// Audio file extensions accepted for transcription (closed set).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "aac", "m4a", "wma"];

/// Returns true if the path carries a supported audio extension
/// (case-insensitive).
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// A speech-to-text engine: one blocking call per audio file.
pub trait SpeechEngine: Send + Sync {
    fn transcribe(&self, audio: &Path) -> Result<String, TranscribeError>;
}

/// Acquires a `SpeechEngine`.
///
/// Acquisition happens once per job, after the job's IN_PROCESS record is
/// written, and may fail with `CapabilityUnavailable`.
pub trait SpeechEngineProvider: Send + Sync {
    fn acquire(&self) -> Result<Box<dyn SpeechEngine>, TranscribeError>;

    /// Cheap readiness probe for health reporting; must not download or
    /// load anything.
    fn is_ready(&self) -> bool;
}

/// Production provider backed by a cached whisper.cpp model.
pub struct WhisperProvider {
    manager: ModelManager,
    #[cfg_attr(not(feature = "whisper"), allow(dead_code))]
    language: Option<String>,
}

impl WhisperProvider {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            manager: ModelManager::from_config(config),
            language: config.language.clone(),
        }
    }
}

impl SpeechEngineProvider for WhisperProvider {
    #[cfg(feature = "whisper")]
    fn acquire(&self) -> Result<Box<dyn SpeechEngine>, TranscribeError> {
        let model_path = self
            .manager
            .ensure_model()
            .map_err(|e| TranscribeError::CapabilityUnavailable(e.to_string()))?;
        let engine = whisper::WhisperEngine::load(&model_path, self.language.clone())?;
        Ok(Box::new(engine))
    }

    #[cfg(not(feature = "whisper"))]
    fn acquire(&self) -> Result<Box<dyn SpeechEngine>, TranscribeError> {
        Err(TranscribeError::CapabilityUnavailable(
            "Built without the whisper feature. Rebuild with --features whisper".to_string(),
        ))
    }

    fn is_ready(&self) -> bool {
        cfg!(feature = "whisper") && self.manager.is_model_available()
    }
}

/// Builds the default provider from model config.
pub fn default_provider(config: &ModelConfig) -> Arc<dyn SpeechEngineProvider> {
    Arc::new(WhisperProvider::new(config))
}
