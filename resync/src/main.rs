use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use crate::batch::{BatchOptions, NodeOutcome};
use crate::sink::OutputMode;

mod align;
mod batch;
mod sink;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Master timestamp file defining the shared timeline
    #[arg(short, long)]
    master: PathBuf,
    /// Directory of raw stream / timestamp file pairs
    #[arg(short, long)]
    input_dir: PathBuf,
    /// Where aligned outputs are written
    #[arg(short, long, default_value = "aligned")]
    output_dir: PathBuf,
    /// Target frame rate for video output
    #[arg(long, default_value_t = 24.0)]
    fps: f64,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputMode::Video)]
    format: OutputMode,
    /// First master frame index to include
    #[arg(long)]
    start_frame: Option<usize>,
    /// Master frame index to stop before
    #[arg(long)]
    end_frame: Option<usize>,
}

fn main() -> ExitCode {
    utils::set_log("resync=info".to_string());
    match run(Args::parse()) {
        Ok(all_ok) if all_ok => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let reports = batch::run(&BatchOptions {
        master: args.master,
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        fps: args.fps,
        mode: args.format,
        start_frame: args.start_frame,
        end_frame: args.end_frame,
    })?;

    let mut all_ok = true;
    for report in &reports {
        match &report.outcome {
            NodeOutcome::Written(path) => {
                info!(node = report.name, out = %path.display(), "ok");
            }
            NodeOutcome::Skipped(reason) => {
                warn!(node = report.name, %reason, "skipped");
            }
            NodeOutcome::Failed(reason) => {
                error!(node = report.name, %reason, "failed");
                all_ok = false;
            }
        }
    }
    info!(nodes = reports.len(), "batch complete");
    Ok(all_ok)
}
