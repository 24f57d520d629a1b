// Speech-to-text backends behind a single trait:
// - AssemblyAi: remote service (upload, create transcript, poll)
// - WhisperCli: local `whisper` command-line tool
//
// Backends only turn an audio file into text. Segment extraction and the
// pipeline's failure handling live in `gateway`.

pub mod assemblyai;
pub mod whisper_cli;

use async_trait::async_trait;
use std::path::Path;

use crate::config::{TranscriberConfig, TranscriberImplementation};
use crate::error::Result;

/// Main trait for transcription operations
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe an audio file. An empty string means no speech was detected.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;

    /// Check that the backend can be reached before a run starts
    async fn check_availability(&self) -> Result<()>;

    /// Human readable backend name for logs
    fn name(&self) -> &'static str;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on the configured implementation
    pub fn create_transcriber(config: TranscriberConfig) -> Result<Box<dyn TranscriberTrait>> {
        let transcriber: Box<dyn TranscriberTrait> = match config.implementation {
            TranscriberImplementation::AssemblyAi => {
                Box::new(assemblyai::AssemblyAiTranscriber::new(config)?)
            }
            TranscriberImplementation::WhisperCli => {
                Box::new(whisper_cli::WhisperCliTranscriber::new(config))
            }
        };
        Ok(transcriber)
    }
}
