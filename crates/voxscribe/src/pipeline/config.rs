use std::path::PathBuf;

use crate::config::Config;

pub struct PipelineConfig {
    pub staging_directory: PathBuf,
    pub output_directory: PathBuf,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            staging_directory: PathBuf::from(&config.staging_directory),
            output_directory: PathBuf::from(&config.output_directory),
        }
    }
}
