use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// One H.264 video per node at the target frame rate.
    Video,
    /// Numbered PNG image sequence per node.
    Png,
    /// Numbered JPEG image sequence per node.
    Jpeg,
}

/// Write one node's aligned frame selection. The index order is already
/// decided; this step only materializes it in the requested format.
pub fn write_aligned(
    mode: OutputMode,
    out_dir: &Path,
    name: &str,
    frames: &[&[u8]],
    indices: &[usize],
    fps: f64,
) -> Result<PathBuf> {
    match mode {
        OutputMode::Jpeg => write_jpeg_sequence(out_dir, name, frames, indices),
        OutputMode::Png => {
            let seq_dir = out_dir.join(name);
            std::fs::create_dir_all(&seq_dir)?;
            if !indices.is_empty() {
                let pattern = seq_dir.join("frame_%05d.png");
                pipe_to_ffmpeg(
                    frames,
                    indices,
                    fps,
                    &[pattern.to_string_lossy().as_ref()],
                )?;
            }
            Ok(seq_dir)
        }
        OutputMode::Video => {
            std::fs::create_dir_all(out_dir)?;
            let out = out_dir.join(format!("{}.mp4", name));
            if indices.is_empty() {
                // An empty timeline still yields the artifact path; the
                // file just has nothing in it.
                std::fs::File::create(&out)?;
            } else {
                pipe_to_ffmpeg(
                    frames,
                    indices,
                    fps,
                    &[
                        "-c:v",
                        "libx264",
                        "-pix_fmt",
                        "yuv420p",
                        out.to_string_lossy().as_ref(),
                    ],
                )?;
            }
            Ok(out)
        }
    }
}

/// Frames are already JPEG, so the sequence is a direct write with no
/// transcode step.
fn write_jpeg_sequence(
    out_dir: &Path,
    name: &str,
    frames: &[&[u8]],
    indices: &[usize],
) -> Result<PathBuf> {
    let seq_dir = out_dir.join(name);
    std::fs::create_dir_all(&seq_dir)?;
    for (i, &idx) in indices.iter().enumerate() {
        let path = seq_dir.join(format!("frame_{:05}.jpg", i));
        std::fs::write(&path, frames[idx])
            .with_context(|| format!("write {}", path.display()))?;
    }
    debug!(node = name, frames = indices.len(), "jpeg sequence written");
    Ok(seq_dir)
}

fn pipe_to_ffmpeg(frames: &[&[u8]], indices: &[usize], fps: f64, tail: &[&str]) -> Result<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "mjpeg"])
        .args(["-framerate", &fps.to_string()])
        .args(["-i", "-"])
        .args(tail)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().context("spawn ffmpeg")?;
    let mut stdin = child.stdin.take().context("ffmpeg stdin")?;

    // Drain stderr concurrently; a chatty ffmpeg filling the pipe would
    // otherwise deadlock against our stdin writes.
    let stderr = child.stderr.take();
    let drain = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut err) = stderr {
            let _ = err.read_to_string(&mut buf);
        }
        buf
    });

    for &idx in indices {
        stdin.write_all(frames[idx])?;
    }
    drop(stdin);

    let status = child.wait()?;
    let stderr = drain.join().unwrap_or_default();
    if !status.success() {
        bail!("ffmpeg failed ({}): {}", status, stderr.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_timeline_video_yields_a_file_path() {
        let dir = TempDir::new().unwrap();
        let out = write_aligned(OutputMode::Video, dir.path(), "cam01", &[], &[], 24.0).unwrap();
        assert_eq!(out, dir.path().join("cam01.mp4"));
        assert!(out.is_file());
        assert_eq!(std::fs::metadata(&out).unwrap().len(), 0);
    }

    #[test]
    fn empty_timeline_png_yields_an_empty_sequence_dir() {
        let dir = TempDir::new().unwrap();
        let out = write_aligned(OutputMode::Png, dir.path(), "cam02", &[], &[], 24.0).unwrap();
        assert_eq!(out, dir.path().join("cam02"));
        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }
}
