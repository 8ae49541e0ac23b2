use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::align::{self, AlignError};
use crate::sink::{self, OutputMode};

pub struct BatchOptions {
    pub master: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub fps: f64,
    pub mode: OutputMode,
    pub start_frame: Option<usize>,
    pub end_frame: Option<usize>,
}

#[derive(Debug)]
pub enum NodeOutcome {
    Written(PathBuf),
    Skipped(String),
    Failed(String),
}

#[derive(Debug)]
pub struct NodeReport {
    pub name: String,
    pub source: PathBuf,
    pub outcome: NodeOutcome,
}

/// Align every raw stream in the input directory against the master
/// timeline. Nodes are independent: a missing timestamp log or a failed
/// write is reported and the batch moves on.
pub fn run(opts: &BatchOptions) -> Result<Vec<NodeReport>> {
    let master = pts::read_series(&opts.master)
        .with_context(|| format!("master series {}", opts.master.display()))?;
    let master = frame_range(&master, opts.start_frame, opts.end_frame);

    let streams = stream_files(&opts.input_dir)?;
    let mut reports = Vec::with_capacity(streams.len());

    for (i, stream) in streams.iter().enumerate() {
        // Names come from sorted input order and stay stable even when a
        // node is skipped.
        let name = format!("cam{:02}", i + 1);
        let outcome = match align_one(opts, master, stream, &name) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(node = name, %err, "alignment failed");
                NodeOutcome::Failed(err.to_string())
            }
        };
        reports.push(NodeReport {
            name,
            source: stream.clone(),
            outcome,
        });
    }
    Ok(reports)
}

fn align_one(
    opts: &BatchOptions,
    master: &[f64],
    stream: &Path,
    name: &str,
) -> Result<NodeOutcome> {
    let pts_path = stream.with_extension("pts");
    if !pts_path.exists() {
        warn!(node = name, stream = %stream.display(), "no timestamp log, skipping");
        return Ok(NodeOutcome::Skipped(format!(
            "missing timestamp log {}",
            pts_path.display()
        )));
    }

    let client = pts::read_series(&pts_path)?;
    let data = std::fs::read(stream)?;
    let frames = mjpeg::split_frames(&data);

    let indices = match align::aligned_indices(master, &client, frames.len()) {
        Ok(indices) => indices,
        Err(AlignError::NoFrames) => {
            return Ok(NodeOutcome::Failed(format!(
                "{} holds no frames",
                stream.display()
            )));
        }
    };

    let out = sink::write_aligned(opts.mode, &opts.output_dir, name, &frames, &indices, opts.fps)?;
    info!(node = name, frames = indices.len(), out = %out.display(), "aligned");
    Ok(NodeOutcome::Written(out))
}

/// Optional index window restricting the master timeline. The end bound
/// is exclusive and clamps to the series length.
fn frame_range<'a>(series: &'a [f64], start: Option<usize>, end: Option<usize>) -> &'a [f64] {
    let end = end.unwrap_or(series.len()).min(series.len());
    let start = start.unwrap_or(0).min(end);
    &series[start..end]
}

/// Raw streams in the input directory, sorted by file name.
fn stream_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("input directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "mjpeg"))
        .collect();
    files.sort();
    Ok(files)
}
