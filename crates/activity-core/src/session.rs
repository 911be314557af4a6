//! Scan orchestration and the activity query surface.
//!
//! A [`ScanSession`] owns the two activity strips and runs the audio and
//! video scanners as independent blocking tasks. The two scans share
//! nothing but the stop flag; each writes only its own strip. Queries are
//! valid while a scan is still running — positions not yet written read
//! `Uninitialized`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scrubmark_common::config::ScanDefaults;
use scrubmark_common::error::{ScrubmarkError, ScrubmarkResult};

use crate::audio::AudioActivityScanner;
use crate::source::{AudioExtractor, FrameSource, NoticeSender};
use crate::strip::{collect_segments, ActivitySegment, ActivityStrip, Track};
use crate::video::VideoActivityScanner;

/// Tuning for both scanners.
///
/// The defaults are deliberate magic numbers carried over from long use;
/// preserve them unless you have a measured reason not to.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Divisor applied to the frame count to size coalescing runs
    /// (`window = num_frames / divisor`). Videos shorter than the divisor
    /// get no coalescing at all.
    pub granularity_divisor: u32,

    /// Scale factor for the audio loudness threshold,
    /// `(peak - average) * scale`.
    pub audio_threshold_scale: f64,

    /// Per-channel absolute difference (0-255 scale) above which two
    /// frames count as different.
    pub video_diff_threshold: u8,

    /// Frames between cooperative stop-flag checks.
    pub stop_poll_interval: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            granularity_divisor: 50,
            audio_threshold_scale: 0.001,
            video_diff_threshold: 30,
            stop_poll_interval: 200,
        }
    }
}

impl ScanConfig {
    /// Number of frames pulled into a run after an active frame.
    pub fn coalesce_window(&self, num_frames: usize) -> usize {
        num_frames / (self.granularity_divisor.max(1) as usize)
    }
}

impl From<ScanDefaults> for ScanConfig {
    fn from(defaults: ScanDefaults) -> Self {
        Self {
            granularity_divisor: defaults.granularity_divisor,
            audio_threshold_scale: defaults.audio_threshold_scale,
            video_diff_threshold: defaults.video_diff_threshold,
            stop_poll_interval: defaults.stop_poll_interval,
        }
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Ran to the end of the strip.
    Completed,
    /// Observed the stop flag and returned early; the strip is valid but
    /// partially populated.
    Cancelled,
    /// Audio only: no usable sample stream, strip filled with `NoData`.
    NoAudio,
}

/// A scan session over one media file.
pub struct ScanSession {
    video_strip: Arc<ActivityStrip>,
    audio_strip: Arc<ActivityStrip>,
    stop_flag: Arc<AtomicBool>,
    audio_usable: Arc<AtomicBool>,
    video_done: Arc<AtomicBool>,
    audio_done: Arc<AtomicBool>,
    video_task: Option<tokio::task::JoinHandle<ScrubmarkResult<ScanOutcome>>>,
    audio_task: Option<tokio::task::JoinHandle<ScanOutcome>>,
}

impl ScanSession {
    /// Allocate both strips and start the two scan tasks.
    ///
    /// `media_path` is handed to the audio extractor on the audio task, so
    /// extraction overlaps the video scan. Fails fast when the frame
    /// source reports no frames.
    pub fn start(
        mut frame_source: Box<dyn FrameSource>,
        audio_extractor: Box<dyn AudioExtractor>,
        media_path: PathBuf,
        config: ScanConfig,
        notices: Option<NoticeSender>,
    ) -> ScrubmarkResult<Self> {
        let num_frames = frame_source.num_frames();
        if num_frames == 0 {
            return Err(ScrubmarkError::scan("the video contains no frames"));
        }

        tracing::info!(num_frames, "Starting activity scan");

        let video_strip = Arc::new(ActivityStrip::new(num_frames));
        let audio_strip = Arc::new(ActivityStrip::new(num_frames));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let audio_usable = Arc::new(AtomicBool::new(false));
        let video_done = Arc::new(AtomicBool::new(false));
        let audio_done = Arc::new(AtomicBool::new(false));

        let video_task = {
            let strip = video_strip.clone();
            let stop = stop_flag.clone();
            let done = video_done.clone();
            let scanner = VideoActivityScanner::new(config);
            tokio::task::spawn_blocking(move || {
                let result = scanner.scan(frame_source.as_mut(), &strip, &stop);
                done.store(true, Ordering::Release);
                if let Err(ref e) = result {
                    tracing::error!(error = %e, "Video scan failed");
                }
                result
            })
        };

        let audio_task = {
            let strip = audio_strip.clone();
            let stop = stop_flag.clone();
            let usable = audio_usable.clone();
            let done = audio_done.clone();
            let scanner = AudioActivityScanner::new(config);
            tokio::task::spawn_blocking(move || {
                let samples = audio_extractor.extract(&media_path);
                if samples.as_ref().is_some_and(|s| s.num_samples() > 0) {
                    usable.store(true, Ordering::Release);
                }
                let outcome = scanner.scan(samples.as_deref(), &strip, &stop, notices.as_ref());
                done.store(true, Ordering::Release);
                outcome
            })
        };

        Ok(Self {
            video_strip,
            audio_strip,
            stop_flag,
            audio_usable,
            video_done,
            audio_done,
            video_task: Some(video_task),
            audio_task: Some(audio_task),
        })
    }

    /// Number of frames covered by each strip.
    pub fn num_frames(&self) -> usize {
        self.video_strip.len()
    }

    /// The video activity strip.
    pub fn video_strip(&self) -> Arc<ActivityStrip> {
        self.video_strip.clone()
    }

    /// The audio activity strip.
    pub fn audio_strip(&self) -> Arc<ActivityStrip> {
        self.audio_strip.clone()
    }

    /// True iff the frame is classified active on the given track.
    /// Out-of-range indices are a caller fault.
    pub fn is_active_at(&self, index: usize, track: Track) -> bool {
        match track {
            Track::Video => self.video_strip.is_active_at(index),
            Track::Audio => self.audio_strip.is_active_at(index),
            Track::Either => {
                self.video_strip.is_active_at(index) || self.audio_strip.is_active_at(index)
            }
        }
    }

    /// True iff a sample stream was successfully obtained for this media,
    /// regardless of whether any frame was marked active.
    pub fn has_usable_audio(&self) -> bool {
        self.audio_usable.load(Ordering::Acquire)
    }

    /// True once both scans have finished, naturally or via cancellation.
    pub fn scan_complete(&self) -> bool {
        self.video_done.load(Ordering::Acquire) && self.audio_done.load(Ordering::Acquire)
    }

    /// First frame of the contiguous active run containing `index` on the
    /// given track. `index` must be active on that track.
    pub fn find_segment_start(&self, index: usize, track: Track) -> usize {
        match track {
            Track::Video => self.video_strip.find_segment_start(index),
            Track::Audio => self.audio_strip.find_segment_start(index),
            Track::Either => {
                assert!(
                    self.is_active_at(index, Track::Either),
                    "find_segment_start called on a frame that is not active"
                );
                let mut start = index;
                while start > 0 && self.is_active_at(start - 1, Track::Either) {
                    start -= 1;
                }
                start
            }
        }
    }

    /// All contiguous active runs on the given track, in order.
    pub fn segments(&self, track: Track) -> Vec<ActivitySegment> {
        collect_segments(self.num_frames(), |i| self.is_active_at(i, track))
    }

    /// Ask both scans to stop at their next poll.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Wait for both scans to finish and return their outcomes as
    /// `(video, audio)`. Video decode faults surface here.
    pub async fn wait(&mut self) -> ScrubmarkResult<(ScanOutcome, ScanOutcome)> {
        let video = match self.video_task.take() {
            Some(task) => task
                .await
                .map_err(|e| ScrubmarkError::scan(format!("video scan task failed: {e}")))??,
            None => return Err(ScrubmarkError::scan("scan results already collected")),
        };

        let audio = match self.audio_task.take() {
            Some(task) => task
                .await
                .map_err(|e| ScrubmarkError::scan(format!("audio scan task failed: {e}")))?,
            None => return Err(ScrubmarkError::scan("scan results already collected")),
        };

        Ok((video, audio))
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}
