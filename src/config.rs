use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SubverifyError};

/// Environment variable that overrides `transcriber.api_key`
pub const API_KEY_ENV: &str = "ASSEMBLYAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub transcriber: TranscriberConfig,
    pub media: MediaConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// A cue matches when its accuracy is strictly greater than this
    pub match_threshold: f64,
    /// Accuracy recorded for a cue whose segment could not be transcribed.
    /// Neutral calibration value, not a measurement.
    pub fallback_accuracy: f64,
    /// Pause between cues so the transcription service is not flooded
    pub inter_cue_delay_ms: u64,
    /// Buffered progress events per subscriber before old ones are dropped
    pub progress_capacity: usize,
    /// Characters of cue text shown in progress events
    pub preview_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TranscriberImplementation {
    /// Remote AssemblyAI-compatible service
    AssemblyAi,
    /// Local `whisper` command-line tool
    WhisperCli,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    pub implementation: TranscriberImplementation,
    /// Base URL of the transcription service
    pub endpoint: String,
    /// API key; the `ASSEMBLYAI_API_KEY` environment variable takes precedence
    pub api_key: Option<String>,
    pub language_code: String,
    pub punctuate: bool,
    pub format_text: bool,
    /// Delay between transcript status polls
    pub poll_interval_ms: u64,
    /// Upper bound for one segment's transcription, uploads included
    pub timeout_secs: u64,
    /// Path to the whisper binary (WhisperCli only)
    pub binary_path: String,
    /// Whisper model name (WhisperCli only)
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    pub sample_rate: u32,
    pub channels: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving generated subtitle tracks
    pub generated_dir: PathBuf,
    /// Write a JSON analysis report next to the generated track
    pub write_report: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.7,
            fallback_accuracy: 0.5,
            inter_cue_delay_ms: 100,
            progress_capacity: 64,
            preview_chars: 50,
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            implementation: TranscriberImplementation::AssemblyAi,
            endpoint: "https://api.assemblyai.com".to_string(),
            api_key: None,
            language_code: "en".to_string(),
            punctuate: true,
            format_text: true,
            poll_interval_ms: 1000,
            timeout_secs: 300,
            binary_path: "whisper".to_string(),
            model: "base".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            sample_rate: 16000,
            channels: 1,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            generated_dir: PathBuf::from("generated_srt"),
            write_report: true,
        }
    }
}

impl PipelineConfig {
    pub fn inter_cue_delay(&self) -> Duration {
        Duration::from_millis(self.inter_cue_delay_ms)
    }
}

impl TranscriberConfig {
    /// API key from the environment, falling back to the configured one
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubverifyError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubverifyError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubverifyError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubverifyError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;
        if !(0.0..=1.0).contains(&pipeline.match_threshold) {
            return Err(SubverifyError::Config(format!(
                "match_threshold must be within [0, 1], got {}",
                pipeline.match_threshold
            )));
        }
        if !(0.0..=1.0).contains(&pipeline.fallback_accuracy) {
            return Err(SubverifyError::Config(format!(
                "fallback_accuracy must be within [0, 1], got {}",
                pipeline.fallback_accuracy
            )));
        }
        if pipeline.progress_capacity == 0 {
            return Err(SubverifyError::Config(
                "progress_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
