use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::TranscriberTrait;
use crate::config::TranscriberConfig;
use crate::error::{Result, SubverifyError};

// Upper bound for the pre-run reachability request
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    language_code: &'a str,
    punctuate: bool,
    format_text: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptResponse {
    pub id: String,
    pub status: TranscriptStatus,
    pub text: Option<String>,
    pub error: Option<String>,
}

impl TranscriptResponse {
    /// Final text once the job has finished, `None` while it is still running
    pub fn outcome(&self) -> Option<Result<String>> {
        match self.status {
            TranscriptStatus::Queued | TranscriptStatus::Processing => None,
            TranscriptStatus::Completed => Some(Ok(self.text.as_deref().unwrap_or("").trim().to_string())),
            TranscriptStatus::Error => Some(Err(SubverifyError::Transcriber(format!(
                "Transcript {} failed: {}",
                self.id,
                self.error.as_deref().unwrap_or("unknown error")
            )))),
        }
    }
}

/// AssemblyAI speech-to-text client
pub struct AssemblyAiTranscriber {
    config: TranscriberConfig,
    client: reqwest::Client,
    api_key: Option<String>,
}

impl AssemblyAiTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        let api_key = config.resolved_api_key();

        Ok(Self {
            config,
            client,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            SubverifyError::Config(format!(
                "No transcription API key configured (set {} or transcriber.api_key)",
                crate::config::API_KEY_ENV
            ))
        })
    }

    async fn upload(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path).await?;
        debug!("Uploading {} bytes from {}", bytes.len(), audio_path.display());

        let response = self
            .client
            .post(self.url("v2/upload"))
            .header("authorization", self.api_key()?)
            .body(bytes)
            .send()
            .await?;
        let upload: UploadResponse = Self::checked(response).await?.json().await?;
        Ok(upload.upload_url)
    }

    async fn create_transcript(&self, audio_url: &str) -> Result<TranscriptResponse> {
        let request = TranscriptRequest {
            audio_url,
            language_code: &self.config.language_code,
            punctuate: self.config.punctuate,
            format_text: self.config.format_text,
        };

        let response = self
            .client
            .post(self.url("v2/transcript"))
            .header("authorization", self.api_key()?)
            .json(&request)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn poll_transcript(&self, id: &str) -> Result<TranscriptResponse> {
        let response = self
            .client
            .get(self.url(&format!("v2/transcript/{}", id)))
            .header("authorization", self.api_key()?)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SubverifyError::Transcriber(format!("API error {}: {}", status, body)))
    }

    async fn run_job(&self, audio_path: &Path) -> Result<String> {
        let audio_url = self.upload(audio_path).await?;
        let mut transcript = self.create_transcript(&audio_url).await?;
        debug!("Created transcript {}", transcript.id);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if let Some(outcome) = transcript.outcome() {
                return outcome;
            }
            tokio::time::sleep(poll_interval).await;
            transcript = self.poll_transcript(&transcript.id).await?;
        }
    }
}

#[async_trait]
impl TranscriberTrait for AssemblyAiTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let deadline = Duration::from_secs(self.config.timeout_secs);
        let text = tokio::time::timeout(deadline, self.run_job(audio_path))
            .await
            .map_err(|_| {
                SubverifyError::Transcriber(format!(
                    "Transcription of {} timed out after {}s",
                    audio_path.display(),
                    self.config.timeout_secs
                ))
            })??;

        if text.is_empty() {
            info!("No speech detected in {}", audio_path.display());
        }
        Ok(text)
    }

    /// Authenticated listing of at most one transcript; proves the endpoint
    /// is reachable and accepts the key
    async fn check_availability(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("v2/transcript?limit=1"))
            .header("authorization", self.api_key()?)
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                SubverifyError::Transcriber(format!(
                    "Transcription service unreachable at {}: {}",
                    self.config.endpoint, e
                ))
            })?;
        Self::checked(response).await?;

        info!("Transcription service available at {}", self.config.endpoint);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AssemblyAI"
    }
}
