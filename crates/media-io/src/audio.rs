//! Audio sample extraction through ffmpeg.
//!
//! The video's audio track is converted to an easier-to-process mono WAV
//! file in a scratch location, loaded into memory, and the scratch file is
//! removed. Every failure along the way — no audio track, no ffmpeg, an
//! unreadable WAV — is the expected degraded mode: the extractor reports
//! "no audio available" and the scan carries on without it.

use std::path::Path;
use std::process::Command;

use scrubmark_activity_core::{AudioExtractor, MemorySamples, SampleSource};
use scrubmark_common::error::{ScrubmarkError, ScrubmarkResult};

/// Extracts a mono 16-bit PCM sample stream from a media file.
pub struct PcmWavExtractor;

impl AudioExtractor for PcmWavExtractor {
    fn extract(&self, path: &Path) -> Option<Box<dyn SampleSource>> {
        match extract_samples(path) {
            Ok(samples) => {
                tracing::info!(num_samples = samples.len(), "Extracted audio samples");
                Some(Box::new(MemorySamples::new(samples)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Audio extraction failed; continuing without audio");
                None
            }
        }
    }
}

fn extract_samples(path: &Path) -> ScrubmarkResult<Vec<i32>> {
    let scratch = tempfile::Builder::new()
        .prefix("scrubmark-audio-")
        .suffix(".wav")
        .tempfile()
        .map_err(|e| ScrubmarkError::audio(format!("failed to create a scratch file: {e}")))?;

    let status = Command::new("ffmpeg")
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(path)
        .args([
            "-flags",
            "bitexact",
            "-map_metadata",
            "-1",
            "-acodec",
            "pcm_s16le",
            "-ac",
            "1",
            "-y",
        ])
        .arg(scratch.path())
        .status()
        .map_err(|e| ScrubmarkError::audio(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(ScrubmarkError::audio(
            "ffmpeg could not extract the audio track",
        ));
    }

    // The scratch WAV is deleted when `scratch` drops.
    read_wav_samples(scratch.path())
}

/// Load every sample of a WAV file into memory as signed amplitudes.
fn read_wav_samples(path: &Path) -> ScrubmarkResult<Vec<i32>> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| ScrubmarkError::audio(format!("failed to open the extracted WAV: {e}")))?;

    let spec = reader.spec();
    tracing::debug!(
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "Reading extracted WAV"
    );

    let samples: Vec<i32> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .into_samples::<i16>()
            .map(|s| s.map(i32::from))
            .collect::<Result<_, _>>()
            .map_err(|e| ScrubmarkError::audio(format!("failed to decode WAV samples: {e}")))?,
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| (v * i16::MAX as f32) as i32))
            .collect::<Result<_, _>>()
            .map_err(|e| ScrubmarkError::audio(format!("failed to decode WAV samples: {e}")))?,
    };

    Ok(samples)
}
