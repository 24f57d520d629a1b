use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::watch;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, SubverifyError};
use crate::gateway::{MediaTranscriptionGateway, SegmentGateway};
use crate::pipeline::{AccuracyPipeline, PipelineResult, PipelineSettings, ProgressBroadcaster, fallback_result};
use crate::subtitle::{generated_track_name, parse_track, write_track};

const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// Files produced by one analysis
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: PipelineResult,
    pub track_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub completed: Vec<AnalysisOutcome>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct Workflow {
    config: Config,
    gateway: Arc<dyn SegmentGateway>,
    progress: ProgressBroadcaster,
    cancel: Option<watch::Receiver<bool>>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let gateway = MediaTranscriptionGateway::from_config(config.media.clone(), config.transcriber.clone())?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    pub fn with_gateway(config: Config, gateway: Arc<dyn SegmentGateway>) -> Self {
        let progress = ProgressBroadcaster::new(config.pipeline.progress_capacity);
        Self {
            config,
            gateway,
            progress,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Progress of every run started by this workflow
    pub fn progress(&self) -> &ProgressBroadcaster {
        &self.progress
    }

    /// Analyze one video against its subtitle track.
    ///
    /// Unreachable collaborators degrade the result instead of failing it;
    /// only input and output problems are errors.
    pub async fn analyze<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: Q,
        output_dir: Option<&Path>,
        report_path: Option<&Path>,
    ) -> Result<AnalysisOutcome> {
        let video_path = video_path.as_ref();
        let subtitle_path = subtitle_path.as_ref();
        info!("Analyzing {} against {}", video_path.display(), subtitle_path.display());

        for path in [video_path, subtitle_path] {
            if !path.is_file() {
                return Err(SubverifyError::FileNotFound(path.display().to_string()));
            }
        }

        let subtitle_file = file_name(subtitle_path);
        let content = fs::read(subtitle_path).await?;
        let cues = parse_track(&String::from_utf8_lossy(&content));
        info!("Parsed {} cues from {}", cues.len(), subtitle_file);
        if cues.is_empty() {
            return Err(SubverifyError::NoCues(subtitle_file));
        }

        let output_dir = output_dir.unwrap_or(self.config.output.generated_dir.as_path());
        fs::create_dir_all(output_dir).await?;

        let (result, track_path) = match self.gateway.check_availability().await {
            Ok(()) => {
                let mut pipeline = AccuracyPipeline::new(
                    self.gateway.clone(),
                    PipelineSettings::from(&self.config.pipeline),
                    self.progress.clone(),
                );
                if let Some(cancel) = &self.cancel {
                    pipeline = pipeline.with_cancellation(cancel.clone());
                }

                let run = pipeline.run(video_path, &subtitle_file, &cues).await;
                let mut result = run.result;

                let track_name = generated_track_name(video_path, Utc::now());
                let track_path = output_dir.join(&track_name);
                write_track(&run.track, &track_path).await?;
                result.generated_track = Some(track_name);

                (result, Some(track_path))
            }
            Err(e) => {
                warn!("Audio processing unavailable, marking every cue as failed: {}", e);
                (fallback_result(video_path, &subtitle_file, &cues), None)
            }
        };

        let report_path = match report_path {
            Some(path) => Some(path.to_path_buf()),
            None if self.config.output.write_report => Some(output_dir.join(report_name(video_path, track_path.as_deref()))),
            None => None,
        };
        if let Some(path) = &report_path {
            fs::write(path, serde_json::to_string_pretty(&result)?).await?;
            info!("Report written to {}", path.display());
        }

        info!("{}", result.summary());
        Ok(AnalysisOutcome {
            result,
            track_path,
            report_path,
        })
    }

    /// Analyze every video under `input_dir` that has a sibling `.srt` of the
    /// same stem. Pairs run one after another; a failed pair is recorded and
    /// skipped.
    pub async fn process_directory<P: AsRef<Path>>(&self, input_dir: P, output_dir: Option<&Path>) -> Result<BatchSummary> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(SubverifyError::Config(format!(
                "Input path is not a directory: {}",
                input_dir.display()
            )));
        }

        let pairs = find_pairs(input_dir);
        info!("Found {} video files to process", pairs.len());

        let mut summary = BatchSummary::default();
        for (video_path, subtitle_path) in pairs {
            if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                warn!("Batch cancelled");
                break;
            }

            let Some(subtitle_path) = subtitle_path else {
                warn!("No subtitle track next to {}", video_path.display());
                summary.failed.push((video_path, "no matching .srt file".to_string()));
                continue;
            };

            match self.analyze(&video_path, &subtitle_path, output_dir, None).await {
                Ok(outcome) => {
                    info!("Successfully processed: {}", video_path.display());
                    summary.completed.push(outcome);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", video_path.display(), e);
                    summary.failed.push((video_path, e.to_string()));
                }
            }
        }

        Ok(summary)
    }
}

/// Videos under `input_dir`, sorted, each with its `.srt` sibling if present
fn find_pairs(input_dir: &Path) -> Vec<(PathBuf, Option<PathBuf>)> {
    let mut videos: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();
    videos.sort();

    videos
        .into_iter()
        .map(|video| {
            let subtitle = video.with_extension("srt");
            let subtitle = subtitle.is_file().then_some(subtitle);
            (video, subtitle)
        })
        .collect()
}

fn report_name(video_path: &Path, track_path: Option<&Path>) -> String {
    match track_path.and_then(|p| p.file_stem()) {
        Some(stem) => format!("{}.json", stem.to_string_lossy()),
        None => {
            let stem = video_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "video".to_string());
            format!("{}_report_{}.json", stem, Utc::now().format("%Y-%m-%dT%H-%M-%S"))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriberConfig;
    use crate::gateway::MockSegmentGateway;
    use crate::media::MediaProcessorTrait;
    use crate::pipeline::PROCESSING_FAILED;
    use crate::transcribe::assemblyai::AssemblyAiTranscriber;
    use assert_fs::TempDir;
    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    const TRACK: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,500\nWorld\n";

    fn config() -> Config {
        let mut config = Config::default();
        config.pipeline.inter_cue_delay_ms = 0;
        config
    }

    fn write_inputs(dir: &TempDir, stem: &str, track: &str) -> (PathBuf, PathBuf) {
        let video = dir.path().join(format!("{}.mp4", stem));
        let subtitles = dir.path().join(format!("{}.srt", stem));
        std::fs::write(&video, b"not really a video").unwrap();
        std::fs::write(&subtitles, track).unwrap();
        (video, subtitles)
    }

    fn available_gateway() -> MockSegmentGateway {
        let mut gateway = MockSegmentGateway::new();
        gateway.expect_check_availability().returning(|| Ok(()));
        gateway.expect_transcribe_range().returning(|_, range| {
            if range.start < 2.0 {
                Ok("hello".to_string())
            } else {
                Err(SubverifyError::Gateway("timeout".to_string()))
            }
        });
        gateway
    }

    #[tokio::test]
    async fn test_analyze_writes_track_and_report() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("generated");
        let (video, subtitles) = write_inputs(&dir, "clip", TRACK);
        let workflow = Workflow::with_gateway(config(), Arc::new(available_gateway()));

        let outcome = workflow.analyze(&video, &subtitles, Some(&out), None).await.unwrap();

        let result = &outcome.result;
        assert_eq!(result.video_file, "clip.mp4");
        assert_eq!(result.subtitle_file, "clip.srt");
        assert_eq!(result.total_cues, 2);
        assert_eq!(result.matched_cues, 1);
        assert_eq!(result.overall_accuracy, 0.75);

        let track_path = outcome.track_path.unwrap();
        let track_name = result.generated_track.clone().unwrap();
        assert!(track_name.starts_with("clip_generated_"));
        assert_eq!(track_path, out.join(&track_name));
        assert_eq!(
            std::fs::read_to_string(&track_path).unwrap(),
            "1\n00:00:01,000 --> 00:00:02,000\nhello\n\n\
             2\n00:00:03,000 --> 00:00:04,500\n[Transcription failed: World]\n\n"
        );

        let report: PipelineResult =
            serde_json::from_str(&std::fs::read_to_string(outcome.report_path.unwrap()).unwrap()).unwrap();
        assert_eq!(&report, result);
    }

    #[tokio::test]
    async fn test_unavailable_gateway_degrades_to_fallback() {
        let dir = TempDir::new().unwrap();
        let (video, subtitles) = write_inputs(&dir, "clip", TRACK);
        let mut gateway = MockSegmentGateway::new();
        gateway
            .expect_check_availability()
            .returning(|| Err(SubverifyError::Transcriber("no api key".to_string())));
        gateway.expect_transcribe_range().never();
        let workflow = Workflow::with_gateway(config(), Arc::new(gateway));

        let outcome = workflow.analyze(&video, &subtitles, Some(dir.path()), None).await.unwrap();

        assert!(outcome.track_path.is_none());
        assert!(outcome.result.generated_track.is_none());
        assert_eq!(outcome.result.total_cues, 2);
        assert_eq!(outcome.result.overall_accuracy, 0.0);
        assert!(outcome.result.cues.iter().all(|c| c.transcribed_text == PROCESSING_FAILED));
        assert!(outcome.report_path.unwrap().exists());
    }

    /// ffmpeg stand-in that is always present
    struct PresentMedia;

    #[async_trait]
    impl MediaProcessorTrait for PresentMedia {
        async fn extract_segment(&self, _video: &Path, _start: f64, _duration: f64, audio_path: &Path) -> Result<()> {
            std::fs::write(audio_path, b"RIFF")?;
            Ok(())
        }

        async fn check_availability(&self) -> Result<()> {
            Ok(())
        }

        async fn get_version_info(&self) -> Result<String> {
            Ok("present".to_string())
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades_whole_run() {
        let dir = TempDir::new().unwrap();
        let (video, subtitles) = write_inputs(&dir, "clip", TRACK);
        let transcriber = AssemblyAiTranscriber::new(TranscriberConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            api_key: Some("key".to_string()),
            ..TranscriberConfig::default()
        })
        .unwrap();
        let gateway = MediaTranscriptionGateway::new(Box::new(PresentMedia), Box::new(transcriber));
        let workflow = Workflow::with_gateway(config(), Arc::new(gateway));

        let outcome = workflow.analyze(&video, &subtitles, Some(dir.path()), None).await.unwrap();

        let result = &outcome.result;
        assert!(outcome.track_path.is_none());
        assert_eq!(result.total_cues, 2);
        assert_eq!(result.matched_cues, 0);
        assert_eq!(result.overall_accuracy, 0.0);
        assert!(result.cues.iter().all(|c| c.accuracy == 0.0 && c.transcribed_text == PROCESSING_FAILED));
    }

    #[tokio::test]
    async fn test_track_without_cues_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (video, subtitles) = write_inputs(&dir, "clip", "this is not a subtitle file\n");
        let mut gateway = MockSegmentGateway::new();
        gateway.expect_check_availability().never();
        let workflow = Workflow::with_gateway(config(), Arc::new(gateway));

        let err = workflow.analyze(&video, &subtitles, Some(dir.path()), None).await.unwrap_err();

        assert!(matches!(err, SubverifyError::NoCues(name) if name == "clip.srt"));
    }

    #[tokio::test]
    async fn test_missing_video_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (_, subtitles) = write_inputs(&dir, "clip", TRACK);
        let workflow = Workflow::with_gateway(config(), Arc::new(MockSegmentGateway::new()));

        let err = workflow
            .analyze(dir.path().join("missing.mp4"), &subtitles, Some(dir.path()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SubverifyError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_explicit_report_path_without_default_reports() {
        let dir = TempDir::new().unwrap();
        let (video, subtitles) = write_inputs(&dir, "clip", TRACK);
        let mut config = config();
        config.output.write_report = false;
        let workflow = Workflow::with_gateway(config.clone(), Arc::new(available_gateway()));

        let outcome = assert_ok!(workflow.analyze(&video, &subtitles, Some(dir.path()), None).await);
        assert!(outcome.report_path.is_none());

        let report = dir.path().join("custom.json");
        let outcome = assert_ok!(workflow.analyze(&video, &subtitles, Some(dir.path()), Some(&report)).await);
        assert_eq!(outcome.report_path.as_deref(), Some(report.as_path()));
        assert!(report.exists());
    }

    #[tokio::test]
    async fn test_batch_pairs_videos_with_tracks() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_inputs(&dir, "a", TRACK);
        write_inputs(&dir, "b", "garbage\n");
        std::fs::write(dir.path().join("c.mkv"), b"video without subtitles").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        let workflow = Workflow::with_gateway(config(), Arc::new(available_gateway()));

        let summary = workflow.process_directory(dir.path(), Some(out.path())).await.unwrap();

        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.completed[0].result.video_file, "a.mp4");
        let failed: Vec<String> = summary
            .failed
            .iter()
            .map(|(path, _)| file_name(path))
            .collect();
        assert_eq!(failed, vec!["b.mp4", "c.mkv"]);
    }

    #[tokio::test]
    async fn test_batch_rejects_file_input() {
        let dir = TempDir::new().unwrap();
        let (video, _) = write_inputs(&dir, "clip", TRACK);
        let workflow = Workflow::with_gateway(config(), Arc::new(MockSegmentGateway::new()));

        assert_err!(workflow.process_directory(&video, None).await);
    }
}
