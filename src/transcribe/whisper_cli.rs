// Local transcription through the `whisper` command-line tool

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use super::TranscriberTrait;
use crate::config::TranscriberConfig;
use crate::error::{Result, SubverifyError};

/// The part of whisper's JSON output the pipeline uses
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
}

pub struct WhisperCliTranscriber {
    config: TranscriberConfig,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    fn parse_output(json_content: &str) -> Result<String> {
        let output: WhisperOutput = serde_json::from_str(json_content)
            .map_err(|e| SubverifyError::Transcriber(format!("Failed to parse whisper JSON: {}", e)))?;
        Ok(output.text.trim().to_string())
    }
}

#[async_trait]
impl TranscriberTrait for WhisperCliTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| SubverifyError::Transcriber(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model").arg(&self.config.model)
            .arg("--output_dir").arg(output_dir)
            .arg("--output_format").arg("json")
            .kill_on_drop(true);
        if !self.config.language_code.is_empty() {
            cmd.arg("--language").arg(&self.config.language_code);
        }

        debug!("Executing whisper command: {:?}", cmd);
        let output = cmd
            .output()
            .await
            .map_err(|e| SubverifyError::Transcriber(format!("Failed to execute whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubverifyError::Transcriber(format!("Whisper failed: {}", stderr.trim())));
        }

        let audio_filename = audio_path
            .file_stem()
            .ok_or_else(|| SubverifyError::Transcriber("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_filename.to_string_lossy()));

        let json_content = tokio::fs::read_to_string(&json_file)
            .await
            .map_err(|e| SubverifyError::Transcriber(format!("Failed to read whisper output: {}", e)))?;

        Self::parse_output(&json_content)
    }

    async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--help")
            .output()
            .await
            .map_err(|e| SubverifyError::Transcriber(format!("whisper command not found: {}", e)))?;

        if output.status.success() {
            info!("whisper command-line tool is available");
            Ok(())
        } else {
            Err(SubverifyError::Transcriber(format!(
                "whisper is not usable: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    fn name(&self) -> &'static str {
        "whisper"
    }
}
