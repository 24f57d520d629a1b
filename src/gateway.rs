//! Boundary to the external extraction and transcription tools.
//!
//! The pipeline only sees [`SegmentGateway`]: a time range of a video goes
//! in, text (or a single failure) comes out.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{MediaConfig, TranscriberConfig};
use crate::error::{Result, SubverifyError};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::transcribe::{TranscriberFactory, TranscriberTrait};

/// Half-open `[start, end)` range in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Reject ranges no extraction could satisfy
    pub fn validate(&self) -> Result<()> {
        let valid = self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.end > self.start;
        if valid {
            Ok(())
        } else {
            Err(SubverifyError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// Transcription of one time range of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SegmentGateway: Send + Sync {
    /// Trimmed transcription of `range`; empty when no speech was detected.
    /// Extraction and transcription failures are reported alike.
    async fn transcribe_range(&self, video_path: &Path, range: TimeRange) -> Result<String>;

    /// Whether the external collaborators can be used at all
    async fn check_availability(&self) -> Result<()>;
}

/// Gateway backed by ffmpeg segment extraction and a speech-to-text backend
pub struct MediaTranscriptionGateway {
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Box<dyn TranscriberTrait>,
}

impl MediaTranscriptionGateway {
    pub fn new(media: Box<dyn MediaProcessorTrait>, transcriber: Box<dyn TranscriberTrait>) -> Self {
        Self { media, transcriber }
    }

    pub fn from_config(media: MediaConfig, transcriber: TranscriberConfig) -> Result<Self> {
        Ok(Self::new(
            MediaProcessorFactory::create_processor(media),
            TranscriberFactory::create_transcriber(transcriber)?,
        ))
    }

    async fn extract_and_transcribe(&self, video_path: &Path, range: TimeRange) -> Result<String> {
        // Scoped to this segment; removed on drop whatever the outcome
        let segment_dir = tempfile::Builder::new().prefix("subverify-segment-").tempdir()?;
        let audio_path = segment_dir
            .path()
            .join(format!("segment_{:.2}_{:.2}.wav", range.start, range.end));

        self.media
            .extract_segment(video_path, range.start, range.duration(), &audio_path)
            .await?;
        let text = self.transcriber.transcribe(&audio_path).await?;

        debug!("Removing segment artifact {}", audio_path.display());
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl SegmentGateway for MediaTranscriptionGateway {
    async fn transcribe_range(&self, video_path: &Path, range: TimeRange) -> Result<String> {
        range.validate()?;

        self.extract_and_transcribe(video_path, range)
            .await
            .map_err(|e| SubverifyError::Gateway(e.to_string()))
    }

    async fn check_availability(&self) -> Result<()> {
        self.media.check_availability().await?;
        self.transcriber.check_availability().await?;
        info!("Using {} for transcription", self.transcriber.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Writes a placeholder file where ffmpeg would put the segment
    struct FakeMedia {
        fail: bool,
        seen: Arc<Mutex<Vec<PathBuf>>>,
    }

    #[async_trait]
    impl MediaProcessorTrait for FakeMedia {
        async fn extract_segment(&self, _video: &Path, _start: f64, _duration: f64, audio_path: &Path) -> Result<()> {
            if self.fail {
                return Err(SubverifyError::Media("decoder exploded".to_string()));
            }
            std::fs::write(audio_path, b"RIFF")?;
            self.seen.lock().unwrap().push(audio_path.to_path_buf());
            Ok(())
        }

        async fn check_availability(&self) -> Result<()> {
            Ok(())
        }

        async fn get_version_info(&self) -> Result<String> {
            Ok("fake".to_string())
        }
    }

    struct FakeTranscriber {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl TranscriberTrait for FakeTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<String> {
            assert!(audio_path.exists());
            self.reply
                .map(str::to_string)
                .ok_or_else(|| SubverifyError::Transcriber("service unavailable".to_string()))
        }

        async fn check_availability(&self) -> Result<()> {
            self.reply
                .map(|_| ())
                .ok_or_else(|| SubverifyError::Transcriber("service unavailable".to_string()))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn gateway(media_fails: bool, reply: Option<&'static str>) -> (MediaTranscriptionGateway, Arc<Mutex<Vec<PathBuf>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let media = FakeMedia {
            fail: media_fails,
            seen: seen.clone(),
        };
        (
            MediaTranscriptionGateway::new(Box::new(media), Box::new(FakeTranscriber { reply })),
            seen,
        )
    }

    #[test]
    fn test_time_range_validation() {
        assert!(TimeRange::new(0.0, 0.5).validate().is_ok());
        assert!(TimeRange::new(2.0, 2.0).validate().is_err());
        assert!(TimeRange::new(3.0, 2.0).validate().is_err());
        assert!(TimeRange::new(-1.0, 2.0).validate().is_err());
        assert!(TimeRange::new(0.0, f64::INFINITY).validate().is_err());
        assert_eq!(TimeRange::new(2.0, 5.0).duration(), 3.0);
    }

    #[tokio::test]
    async fn test_transcribes_and_cleans_up_segment() {
        let (gateway, seen) = gateway(false, Some("  the quick fox \n"));

        let text = gateway
            .transcribe_range(Path::new("video.mp4"), TimeRange::new(2.0, 5.0))
            .await
            .unwrap();

        assert_eq!(text, "the quick fox");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].exists());
    }

    #[tokio::test]
    async fn test_transcription_failure_cleans_up_segment() {
        let (gateway, seen) = gateway(false, None);

        let err = gateway
            .transcribe_range(Path::new("video.mp4"), TimeRange::new(2.0, 5.0))
            .await
            .unwrap_err();

        assert!(matches!(err, SubverifyError::Gateway(_)));
        assert!(!seen.lock().unwrap()[0].exists());
    }

    #[tokio::test]
    async fn test_extraction_failure_is_gateway_error() {
        let (gateway, _) = gateway(true, Some("unused"));

        let err = gateway
            .transcribe_range(Path::new("video.mp4"), TimeRange::new(2.0, 5.0))
            .await
            .unwrap_err();

        assert!(matches!(err, SubverifyError::Gateway(message) if message.contains("decoder exploded")));
    }

    #[tokio::test]
    async fn test_degenerate_range_rejected_before_extraction() {
        let (gateway, seen) = gateway(false, Some("unused"));

        let err = gateway
            .transcribe_range(Path::new("video.mp4"), TimeRange::new(5.0, 5.0))
            .await
            .unwrap_err();

        assert!(matches!(err, SubverifyError::InvalidTimeRange { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_availability_requires_transcriber() {
        let (gateway, _) = gateway(false, None);
        assert!(gateway.check_availability().await.is_err());
    }
}
