use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use super::{MediaCommandBuilder, MediaProcessorTrait};
use crate::config::MediaConfig;
use crate::error::{Result, SubverifyError};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn extract_segment(
        &self,
        video_path: &Path,
        start: f64,
        duration: f64,
        audio_path: &Path,
    ) -> Result<()> {
        debug!(
            "Extracting audio segment {:.3}s (+{:.3}s) from {}",
            start,
            duration,
            video_path.display()
        );

        let command = self.command_builder.extract_segment(
            video_path,
            start,
            duration,
            audio_path,
            self.config.sample_rate,
            self.config.channels,
        );
        command.execute().await?;

        if !audio_path.exists() {
            return Err(SubverifyError::Media(format!(
                "Audio segment was not written: {}",
                audio_path.display()
            )));
        }

        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        let version = self.get_version_info().await?;
        info!("Media processor is available: {}", version);
        Ok(())
    }

    async fn get_version_info(&self) -> Result<String> {
        let stdout = self
            .command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| SubverifyError::Media(format!("Media processor not found: {}", e)))?;

        // The first line carries the version
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }
}
