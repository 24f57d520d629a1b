//! SubRip subtitle tracks: the cue model, parsing, the time codec and
//! rendering of regenerated tracks.

pub mod parser;
pub mod timecode;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use parser::parse_track;
pub use timecode::{to_seconds, to_text};
pub use writer::{TrackRecord, generated_track_name, render_track, write_track};

use crate::error::Result;

/// One timed subtitle entry as it appears in the source track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    pub id: u32,
    /// `HH:MM:SS,mmm`
    pub start_time: String,
    /// `HH:MM:SS,mmm`
    pub end_time: String,
    pub text: String,
}

impl Cue {
    pub fn new(id: u32, start_time: impl Into<String>, end_time: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            start_time: start_time.into(),
            end_time: end_time.into(),
            text: text.into(),
        }
    }

    /// Start and end in seconds
    pub fn seconds(&self) -> Result<(f64, f64)> {
        Ok((to_seconds(&self.start_time)?, to_seconds(&self.end_time)?))
    }

    /// True when the cue does not span a positive duration
    pub fn is_degenerate(&self) -> bool {
        match self.seconds() {
            Ok((start, end)) => end <= start,
            Err(_) => true,
        }
    }

    /// Cue text cut to `max_chars` characters for display
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() > max_chars {
            let cut: String = self.text.chars().take(max_chars).collect();
            format!("{}...", cut)
        } else {
            self.text.clone()
        }
    }
}
