//! Subverify - subtitle accuracy verification
//!
//! Command-line entry point: loads configuration, wires logging and progress
//! rendering, and dispatches to the workflow.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{Level, info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use subverify::cli::{Args, Commands};
use subverify::config::Config;
use subverify::error::SubverifyError;
use subverify::pipeline::{CueStatus, PipelineResult, ProgressEvent};
use subverify::subtitle::parse_track;
use subverify::workflow::Workflow;

const DEFAULT_CONFIG_FILE: &str = "subverify.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Analyze {
            video,
            subtitles,
            output_dir,
            report,
        } => {
            let workflow = Workflow::new(config)?.with_cancellation(cancel_on_ctrl_c());
            let (bar, renderer) = render_progress(workflow.progress().subscribe());

            let outcome = workflow
                .analyze(&video, &subtitles, output_dir.as_deref(), report.as_deref())
                .await;
            renderer.abort();
            bar.finish_and_clear();

            let outcome = outcome?;
            print_result(&outcome.result);
            if let Some(track) = &outcome.track_path {
                println!("Generated track: {}", track.display());
            }
            if let Some(report) = &outcome.report_path {
                println!("Report: {}", report.display());
            }
        }
        Commands::Batch { input_dir, output_dir } => {
            let workflow = Workflow::new(config)?.with_cancellation(cancel_on_ctrl_c());
            let (bar, renderer) = render_progress(workflow.progress().subscribe());

            let summary = workflow.process_directory(&input_dir, output_dir.as_deref()).await;
            renderer.abort();
            bar.finish_and_clear();

            let summary = summary?;
            for outcome in &summary.completed {
                println!("{}", outcome.result.summary());
            }
            for (video, reason) in &summary.failed {
                println!("Skipped {}: {}", video.display(), reason);
            }
            println!(
                "Processed {} videos, {} skipped",
                summary.completed.len(),
                summary.failed.len()
            );
        }
        Commands::Inspect { subtitles } => {
            if !subtitles.is_file() {
                return Err(SubverifyError::FileNotFound(subtitles.display().to_string()).into());
            }
            let content = std::fs::read(&subtitles)?;
            let cues = parse_track(&String::from_utf8_lossy(&content));

            println!("{:<6} {:<13} {:<13} Text", "Id", "Start", "End");
            println!("{}", "-".repeat(72));
            for cue in &cues {
                let flag = if cue.is_degenerate() { " [invalid range]" } else { "" };
                println!(
                    "{:<6} {:<13} {:<13} {}{}",
                    cue.id,
                    cue.start_time,
                    cue.end_time,
                    cue.preview(config.pipeline.preview_chars),
                    flag
                );
            }
            println!("{} cues", cues.len());
        }
        Commands::InitConfig { output } => {
            if output.exists() {
                return Err(SubverifyError::Config(format!("{} already exists", output.display())).into());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Flip the cancellation flag on the first Ctrl-C; the cue in flight finishes
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current cue");
            let _ = tx.send(true);
        }
    });
    rx
}

/// Draw progress events on a terminal bar until aborted
fn render_progress(mut events: broadcast::Receiver<ProgressEvent>) -> (ProgressBar, JoinHandle<()>) {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cues {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("#>-"));

    let handle = {
        let bar = bar.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        bar.set_length(event.total as u64);
                        let finished = matches!(event.status, CueStatus::Done | CueStatus::Failed);
                        let position = if finished { event.current } else { event.current.saturating_sub(1) };
                        bar.set_position(position as u64);
                        bar.set_message(format!("#{} {}: {}", event.cue_id, event.status.label(), event.text));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    (bar, handle)
}

fn print_result(result: &PipelineResult) {
    println!("\n{}", result.summary());
    if result.cancelled {
        println!("Run was cancelled; the counts cover processed cues only");
    }

    let mismatches: Vec<_> = result.cues.iter().filter(|c| !c.is_match).collect();
    if !mismatches.is_empty() {
        println!("\nCues below threshold:");
        for scored in mismatches {
            println!(
                "  #{:<5} {} --> {} {:>5.1}%  expected: {}  heard: {}",
                scored.cue.id,
                scored.cue.start_time,
                scored.cue.end_time,
                scored.accuracy * 100.0,
                scored.cue.text,
                scored.transcribed_text
            );
        }
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".subverify").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subverify.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subverify.log").display()
    );

    Ok(())
}
