use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a subtitle track against the speech in its video
    Analyze {
        /// Input video file
        #[arg(long)]
        video: PathBuf,

        /// Subtitle track (.srt) to verify
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output directory for the generated track
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write the JSON report to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Analyze every video in a directory that has a matching .srt
    Batch {
        /// Input directory containing video and subtitle files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for generated tracks and reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List the cues of a subtitle track
    Inspect {
        /// Subtitle track (.srt)
        #[arg(short, long)]
        subtitles: PathBuf,
    },

    /// Write the default configuration
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "subverify.toml")]
        output: PathBuf,
    },
}
