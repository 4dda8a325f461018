use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Where uploads are staged until their task finishes.
    pub staging_directory: String,
    /// Where completed transcript files are written.
    pub output_directory: String,
    /// SQLite database path; defaults to the per-user data directory.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub model: ModelConfig,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_model_repo")]
    pub repo: String,
    #[serde(default = "default_model_file")]
    pub file: String,
    /// Spoken language hint passed to the engine; autodetect when unset.
    #[serde(default)]
    pub language: Option<String>,
}

fn default_model_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".voxscribe")
        .join("models")
}

fn default_model_repo() -> String {
    "ggerganov/whisper.cpp".to_string()
}

fn default_model_file() -> String {
    "ggml-base.en.bin".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_model_cache_dir(),
            repo: default_model_repo(),
            file: default_model_file(),
            language: None,
        }
    }
}
