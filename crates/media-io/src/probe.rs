//! Video metadata probing via ffprobe.

use std::path::Path;
use std::process::Command;

use scrubmark_common::error::{ScrubmarkError, ScrubmarkResult};

/// Probed properties of a video's primary stream.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Average frame rate.
    pub fps: f64,
    /// Total frame count of the video stream.
    pub num_frames: usize,
    pub duration_secs: f64,
}

/// Check that FFmpeg is installed and callable.
pub fn check_ffmpeg() -> ScrubmarkResult<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        ScrubmarkError::probe(format!(
            "ffmpeg not found; install FFmpeg and make sure it is on PATH ({e})"
        ))
    })?;

    if !output.status.success() {
        return Err(ScrubmarkError::probe("ffmpeg version check failed"));
    }

    tracing::debug!("ffmpeg is available");
    Ok(())
}

/// Check that ffprobe is installed and callable.
pub fn check_ffprobe() -> ScrubmarkResult<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            ScrubmarkError::probe(format!(
                "ffprobe not found; install FFmpeg (it includes ffprobe) ({e})"
            ))
        })?;

    if !output.status.success() {
        return Err(ScrubmarkError::probe("ffprobe version check failed"));
    }

    tracing::debug!("ffprobe is available");
    Ok(())
}

/// Probe the primary video stream of a media file.
///
/// Fails when the file has no video stream or when the frame count cannot
/// be established — a scan needs a known, non-zero frame count to size its
/// strips.
pub fn probe_video(path: &Path) -> ScrubmarkResult<VideoInfo> {
    if !path.exists() {
        return Err(ScrubmarkError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,nb_frames",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| ScrubmarkError::probe(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScrubmarkError::probe(format!("ffprobe failed: {stderr}")));
    }

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    let stream = parsed["streams"]
        .get(0)
        .ok_or_else(|| ScrubmarkError::probe("the file has no video stream"))?;

    let width = stream["width"]
        .as_u64()
        .ok_or_else(|| ScrubmarkError::probe("video stream has no width"))? as u32;
    let height = stream["height"]
        .as_u64()
        .ok_or_else(|| ScrubmarkError::probe("video stream has no height"))? as u32;

    let fps = stream["avg_frame_rate"]
        .as_str()
        .and_then(parse_frame_rate)
        .ok_or_else(|| ScrubmarkError::probe("video stream has no usable frame rate"))?;

    let duration_secs = parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let num_frames = frame_count(stream["nb_frames"].as_str(), duration_secs, fps)
        .ok_or_else(|| ScrubmarkError::probe("could not determine the video's frame count"))?;

    let info = VideoInfo {
        width,
        height,
        fps,
        num_frames,
        duration_secs,
    };
    tracing::debug!(?info, "Probed video");
    Ok(info)
}

/// Parse an ffprobe rational frame rate such as `"30000/1001"` or `"25/1"`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.trim().split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Frame count from `nb_frames`, falling back to `duration * fps` for
/// containers that do not carry it.
fn frame_count(nb_frames: Option<&str>, duration_secs: f64, fps: f64) -> Option<usize> {
    if let Some(count) = nb_frames.and_then(|s| s.trim().parse::<usize>().ok()) {
        if count > 0 {
            return Some(count);
        }
    }

    let derived = (duration_secs * fps).round() as usize;
    (derived > 0).then_some(derived)
}
