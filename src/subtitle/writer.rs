use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;
use tracing::info;

use super::timecode::to_text;
use crate::error::Result;

/// One block of a generated track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    /// Identifier of the source cue; output numbering ignores it
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TrackRecord {
    pub fn new(index: u32, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }
}

/// Render records as SubRip text, numbering blocks from 1
pub fn render_track(records: &[TrackRecord]) -> String {
    let mut srt_content = String::new();

    for (index, record) in records.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            to_text(record.start),
            to_text(record.end),
            record.text.trim()
        ));
    }

    srt_content
}

/// Write records as a SubRip file
pub async fn write_track<P: AsRef<Path>>(records: &[TrackRecord], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing generated track: {}", output_path.display());

    fs::write(output_path, render_track(records)).await?;

    info!("Generated track written ({} cues)", records.len());
    Ok(())
}

/// `<video stem>_generated_<UTC timestamp>.srt`
pub fn generated_track_name(video_path: &Path, now: DateTime<Utc>) -> String {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    format!("{}_generated_{}.srt", stem, now.format("%Y-%m-%dT%H-%M-%S"))
}
