//! Scan a recording and report its activity segments.

use std::path::PathBuf;

use serde::Serialize;

use scrubmark_activity_core::{
    ActivitySegment, ScanConfig, ScanNotice, ScanOutcome, ScanSession, Track,
};
use scrubmark_media_io::{
    check_ffmpeg, check_ffprobe, probe_video, PcmWavExtractor, PipeFrameSource,
};

/// Machine-readable scan report.
#[derive(Debug, Serialize)]
struct ScanReport {
    num_frames: usize,
    fps: f64,
    has_usable_audio: bool,
    video_segments: Vec<ActivitySegment>,
    audio_segments: Vec<ActivitySegment>,
}

pub async fn run(path: PathBuf, config: ScanConfig, json: bool) -> anyhow::Result<()> {
    check_ffmpeg()?;
    check_ffprobe()?;

    let info = probe_video(&path).map_err(|e| anyhow::anyhow!("Failed to probe the video: {e}"))?;

    if !json {
        println!("Scanning: {}", path.display());
        println!(
            "  {}x{} @ {:.3} fps, {} frames ({:.2}s)",
            info.width, info.height, info.fps, info.num_frames, info.duration_secs
        );
    }

    let fps = info.fps;
    let frames = PipeFrameSource::open(&path, info)
        .map_err(|e| anyhow::anyhow!("Failed to open the video: {e}"))?;

    let (notice_tx, mut notice_rx) = tokio::sync::mpsc::unbounded_channel();

    let mut session = ScanSession::start(
        Box::new(frames),
        Box::new(PcmWavExtractor),
        path.clone(),
        config,
        Some(notice_tx),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start the scan: {e}"))?;

    let (video_outcome, audio_outcome) = session
        .wait()
        .await
        .map_err(|e| anyhow::anyhow!("Scan failed: {e}"))?;

    while let Ok(notice) = notice_rx.try_recv() {
        match notice {
            ScanNotice::AudioUnavailable => {
                eprintln!("note: the audio track could not be processed")
            }
        }
    }

    let report = ScanReport {
        num_frames: session.num_frames(),
        fps,
        has_usable_audio: session.has_usable_audio(),
        video_segments: session.segments(Track::Video),
        audio_segments: session.segments(Track::Audio),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_track("Video activity", &report.video_segments, fps, video_outcome);
    if report.has_usable_audio {
        print_track("Audio activity", &report.audio_segments, fps, audio_outcome);
    } else {
        println!("\nAudio activity: no usable audio track");
    }

    println!("\nScan complete.");
    Ok(())
}

fn print_track(label: &str, segments: &[ActivitySegment], fps: f64, outcome: ScanOutcome) {
    println!("\n{label}: {} segment(s)", segments.len());
    for segment in segments {
        println!(
            "  frames {:>6} - {:<6} ({:>8.2}s - {:<8.2}s)",
            segment.start,
            segment.end,
            segment.start as f64 / fps,
            segment.end as f64 / fps,
        );
    }
    if outcome == ScanOutcome::Cancelled {
        println!("  (scan was cancelled; the tail of the strip is unknown)");
    }
}
