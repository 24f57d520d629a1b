//! Per-cue accuracy pipeline.
//!
//! Every cue goes through the gateway once, strictly in order and one at a
//! time. The single transcription feeds both the scored cue and the line of
//! the regenerated track. A failed cue is recorded with a fallback score and
//! never stops the run.

pub mod progress;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

pub use progress::{CueStatus, ProgressBroadcaster, ProgressEvent};

use crate::config::PipelineConfig;
use crate::gateway::{SegmentGateway, TimeRange};
use crate::quality::{is_match, similarity};
use crate::subtitle::{Cue, TrackRecord};

pub const NO_SPEECH: &str = "[No speech detected]";
pub const TRANSCRIPTION_FAILED: &str = "[Transcription failed]";
pub const PROCESSING_FAILED: &str = "[Audio processing failed]";

/// A cue with its measured agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCue {
    #[serde(flatten)]
    pub cue: Cue,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub accuracy: f64,
    pub transcribed_text: String,
    pub is_match: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub video_file: String,
    pub subtitle_file: String,
    pub total_cues: usize,
    pub matched_cues: usize,
    pub overall_accuracy: f64,
    pub cues: Vec<ScoredCue>,
    pub processing_time_ms: u64,
    /// File name of the regenerated track, when one was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_track: Option<String>,
    /// The run stopped early; `cues` holds what was processed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl PipelineResult {
    fn from_cues(video_file: String, subtitle_file: String, cues: Vec<ScoredCue>, elapsed: Duration) -> Self {
        let total_cues = cues.len();
        let matched_cues = cues.iter().filter(|c| c.is_match).count();
        let overall_accuracy = if total_cues == 0 {
            0.0
        } else {
            cues.iter().map(|c| c.accuracy).sum::<f64>() / total_cues as f64
        };

        Self {
            video_file,
            subtitle_file,
            total_cues,
            matched_cues,
            overall_accuracy,
            cues,
            processing_time_ms: elapsed.as_millis() as u64,
            generated_track: None,
            cancelled: false,
        }
    }

    pub fn failed_cues(&self) -> usize {
        self.cues
            .iter()
            .filter(|c| c.transcribed_text == TRANSCRIPTION_FAILED || c.transcribed_text == PROCESSING_FAILED)
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} cues matched, overall accuracy {:.1}%, {} failed, {:.1}s",
            self.video_file,
            self.matched_cues,
            self.total_cues,
            self.overall_accuracy * 100.0,
            self.failed_cues(),
            self.processing_time_ms as f64 / 1000.0
        )
    }
}

/// Scored result plus the regenerated track, one record per scored cue
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub result: PipelineResult,
    pub track: Vec<TrackRecord>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub match_threshold: f64,
    pub fallback_accuracy: f64,
    pub inter_cue_delay: Duration,
    pub preview_chars: usize,
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            match_threshold: config.match_threshold,
            fallback_accuracy: config.fallback_accuracy,
            inter_cue_delay: config.inter_cue_delay(),
            preview_chars: config.preview_chars,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

pub struct AccuracyPipeline {
    gateway: Arc<dyn SegmentGateway>,
    settings: PipelineSettings,
    progress: ProgressBroadcaster,
    cancel: Option<watch::Receiver<bool>>,
}

impl AccuracyPipeline {
    pub fn new(gateway: Arc<dyn SegmentGateway>, settings: PipelineSettings, progress: ProgressBroadcaster) -> Self {
        Self {
            gateway,
            settings,
            progress,
            cancel: None,
        }
    }

    /// Stop before the next cue once the flag turns true
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn progress(&self) -> &ProgressBroadcaster {
        &self.progress
    }

    pub async fn run(&self, video_path: &Path, subtitle_file: &str, cues: &[Cue]) -> PipelineRun {
        let started = Instant::now();
        let total = cues.len();
        info!("Processing {} cues against {}", total, video_path.display());

        let mut scored = Vec::with_capacity(total);
        let mut track = Vec::with_capacity(total);
        let mut cancelled = false;

        for (i, cue) in cues.iter().enumerate() {
            if i > 0 && !self.settings.inter_cue_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_cue_delay).await;
            }
            // A cancel during the pause starts no further cue
            if self.is_cancelled() {
                warn!("Run cancelled after {} of {} cues", i, total);
                cancelled = true;
                break;
            }

            let (scored_cue, record) = self.process_cue(video_path, i + 1, total, cue).await;
            scored.push(scored_cue);
            track.push(record);
        }

        let mut result = PipelineResult::from_cues(display_name(video_path), subtitle_file.to_string(), scored, started.elapsed());
        result.cancelled = cancelled;
        info!(
            "Processing complete: {} matched, {} failed, overall accuracy {:.3}",
            result.matched_cues,
            result.failed_cues(),
            result.overall_accuracy
        );

        PipelineRun { result, track }
    }

    async fn process_cue(&self, video_path: &Path, current: usize, total: usize, cue: &Cue) -> (ScoredCue, TrackRecord) {
        info!("Processing cue {}/{}: \"{}\"", current, total, cue.preview(self.settings.preview_chars));
        self.emit(current, total, cue, CueStatus::Queued);
        self.emit(current, total, cue, CueStatus::Extracting);

        let (start, end, transcription) = match cue.seconds() {
            Ok((start, end)) => {
                if end <= start {
                    warn!("Invalid timestamp for cue {}: start={}s, end={}s", cue.id, start, end);
                }
                self.emit(current, total, cue, CueStatus::Transcribing);
                let transcription = self.gateway.transcribe_range(video_path, TimeRange::new(start, end)).await;
                (start, end, transcription)
            }
            Err(e) => (0.0, 0.0, Err(e)),
        };

        match transcription {
            Ok(text) => {
                let accuracy = similarity(&cue.text, &text);
                let shown = if text.is_empty() { NO_SPEECH.to_string() } else { text };
                let scored = ScoredCue {
                    cue: cue.clone(),
                    start_seconds: start,
                    end_seconds: end,
                    accuracy,
                    transcribed_text: shown.clone(),
                    is_match: is_match(accuracy, self.settings.match_threshold),
                };
                self.emit(current, total, cue, CueStatus::Done);
                (scored, TrackRecord::new(cue.id, start, end, shown))
            }
            Err(e) => {
                warn!("Cue {} could not be transcribed: {}", cue.id, e);
                let scored = ScoredCue {
                    cue: cue.clone(),
                    start_seconds: start,
                    end_seconds: end,
                    accuracy: self.settings.fallback_accuracy,
                    transcribed_text: TRANSCRIPTION_FAILED.to_string(),
                    is_match: false,
                };
                self.emit(current, total, cue, CueStatus::Failed);
                let record = TrackRecord::new(cue.id, start, end, format!("[Transcription failed: {}]", cue.text));
                (scored, record)
            }
        }
    }

    fn emit(&self, current: usize, total: usize, cue: &Cue, status: CueStatus) {
        self.progress.emit(ProgressEvent {
            current,
            total,
            cue_id: cue.id,
            text: cue.preview(self.settings.preview_chars),
            status,
        });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

/// Result for a run whose collaborators were unreachable: every cue failed
/// with zero accuracy.
pub fn fallback_result(video_path: &Path, subtitle_file: &str, cues: &[Cue]) -> PipelineResult {
    let scored = cues
        .iter()
        .map(|cue| {
            let (start_seconds, end_seconds) = cue.seconds().unwrap_or((0.0, 0.0));
            ScoredCue {
                cue: cue.clone(),
                start_seconds,
                end_seconds,
                accuracy: 0.0,
                transcribed_text: PROCESSING_FAILED.to_string(),
                is_match: false,
            }
        })
        .collect();

    PipelineResult::from_cues(display_name(video_path), subtitle_file.to_string(), scored, Duration::ZERO)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
