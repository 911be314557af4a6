//! Collaborator seams for decoded media.
//!
//! The scanners never touch files or subprocesses directly; decoded frames
//! and samples arrive through these traits so the core stays testable
//! without any external tooling installed.

use std::path::Path;

use scrubmark_common::error::ScrubmarkResult;

use crate::diff::Frame;

/// A decoded frame stream with sequential read and random seek.
///
/// Construction is the fallible "open"; a source that cannot be opened
/// never reaches a scanner.
pub trait FrameSource: Send {
    /// Total number of frames in the video.
    fn num_frames(&self) -> usize;

    /// Declared frame width in pixels.
    fn width(&self) -> u32;

    /// Declared frame height in pixels.
    fn height(&self) -> u32;

    /// Position the stream so the next read returns `frame_index`.
    fn seek(&mut self, frame_index: usize) -> ScrubmarkResult<()>;

    /// Read the next frame, or `None` at end of stream.
    fn read_next(&mut self) -> ScrubmarkResult<Option<Frame>>;
}

/// A decoded mono amplitude stream, time-aligned to the video's duration.
pub trait SampleSource: Send {
    /// Total number of samples.
    fn num_samples(&self) -> usize;

    /// Signed amplitude at a sample index. Out-of-range is a caller fault.
    fn sample_at(&self, index: usize) -> i32;
}

/// Produces a sample stream for a media file, or signals that no audio is
/// available. `None` is the expected degraded mode, never an error: the
/// audio strip is filled with `NoData` and the video scan proceeds.
pub trait AudioExtractor: Send {
    fn extract(&self, path: &Path) -> Option<Box<dyn SampleSource>>;
}

/// An in-memory sample sequence.
///
/// The natural target for extractor implementations, and the workhorse of
/// scanner tests.
pub struct MemorySamples {
    samples: Vec<i32>,
}

impl MemorySamples {
    pub fn new(samples: Vec<i32>) -> Self {
        Self { samples }
    }
}

impl SampleSource for MemorySamples {
    fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn sample_at(&self, index: usize) -> i32 {
        self.samples[index]
    }
}

/// Non-fatal events surfaced to the user during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanNotice {
    /// The audio track could not be extracted or decoded; the audio strip
    /// carries no data.
    AudioUnavailable,
}

/// Fire-and-forget channel for [`ScanNotice`] events.
pub type NoticeSender = tokio::sync::mpsc::UnboundedSender<ScanNotice>;
