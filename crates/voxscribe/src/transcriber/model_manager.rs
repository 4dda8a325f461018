//! Model download and cache management using Hugging Face Hub.

use std::path::{Path, PathBuf};

#[cfg(feature = "whisper")]
use hf_hub::api::sync::Api;
#[cfg(feature = "whisper")]
use hf_hub::{Repo, RepoType};
#[allow(unused_imports)]
use log::{debug, info, warn};
use thiserror::Error;

/// Errors that can occur during model management.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to create cache directory: {0}")]
    CacheDirectoryCreation(#[from] std::io::Error),

    #[error("Failed to download model from Hugging Face: {0}")]
    HuggingFaceDownload(String),

    #[error("Model file not found: {0}")]
    ModelNotFound(String),
}

/// Manages whisper model downloads and caching.
pub struct ModelManager {
    cache_dir: PathBuf,
    model_repo: String,
    model_file: String,
}

impl ModelManager {
    /// Creates a new model manager.
    pub fn new(cache_dir: impl AsRef<Path>, model_repo: &str, model_file: &str) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            model_repo: model_repo.to_string(),
            model_file: model_file.to_string(),
        }
    }

    /// Creates a model manager from model config.
    pub fn from_config(config: &crate::config::schema::ModelConfig) -> Self {
        Self::new(&config.cache_dir, &config.repo, &config.file)
    }

    /// Returns the path to the cached model file.
    pub fn model_path(&self) -> PathBuf {
        self.cache_dir.join(&self.model_file)
    }

    /// Checks if the model is already downloaded.
    pub fn is_model_available(&self) -> bool {
        self.model_path().exists()
    }

    /// Ensures the model is available, downloading if necessary.
    #[cfg(feature = "whisper")]
    pub fn ensure_model(&self) -> Result<PathBuf, ModelError> {
        let model_path = self.model_path();

        if model_path.exists() {
            debug!("Model already cached at: {}", model_path.display());
            return Ok(model_path);
        }

        std::fs::create_dir_all(&self.cache_dir)?;

        info!(
            "Downloading model {} from {}...",
            self.model_file, self.model_repo
        );

        let api = Api::new().map_err(|e| ModelError::HuggingFaceDownload(e.to_string()))?;
        let repo = api.repo(Repo::new(self.model_repo.clone(), RepoType::Model));

        let downloaded_path = repo
            .get(&self.model_file)
            .map_err(|e| ModelError::HuggingFaceDownload(e.to_string()))?;

        info!("Model downloaded to: {}", downloaded_path.display());

        // hf-hub keeps files in its own cache; symlink into ours to avoid
        // duplicating a multi-hundred-MB file, falling back to a copy.
        #[cfg(unix)]
        {
            if let Err(e) = std::os::unix::fs::symlink(&downloaded_path, &model_path) {
                warn!("Failed to create symlink, copying instead: {}", e);
                std::fs::copy(&downloaded_path, &model_path)?;
            }
        }

        #[cfg(not(unix))]
        {
            std::fs::copy(&downloaded_path, &model_path)?;
        }

        Ok(model_path)
    }

    /// Ensures the model is available (stub when the whisper feature is
    /// disabled): only an already-cached model counts.
    #[cfg(not(feature = "whisper"))]
    pub fn ensure_model(&self) -> Result<PathBuf, ModelError> {
        let model_path = self.model_path();

        if model_path.exists() {
            debug!("Model already cached at: {}", model_path.display());
            return Ok(model_path);
        }

        Err(ModelError::ModelNotFound(format!(
            "{} (built without the whisper feature, downloads disabled)",
            model_path.display()
        )))
    }

    /// Returns the model repository name.
    pub fn model_repo(&self) -> &str {
        &self.model_repo
    }

    /// Returns the model filename.
    pub fn model_file(&self) -> &str {
        &self.model_file
    }
}
