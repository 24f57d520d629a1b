//! Subverify - subtitle accuracy verification
//!
//! Checks a subtitle track against the speech in its video: each cue's time
//! range is extracted with ffmpeg, transcribed, and scored against the cue
//! text. A regenerated track built from the transcriptions is written
//! alongside the scored report.

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod media;
pub mod pipeline;
pub mod quality;
pub mod subtitle;
pub mod transcribe;
pub mod workflow;
