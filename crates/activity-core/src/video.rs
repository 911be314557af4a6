//! Video activity scanning.
//!
//! Compares the video's frames in pairs and marks a frame active when its
//! color values differ notably from the preceding frame. An active frame
//! pulls the following frames into the run without decoding them; the scan
//! then seeks past the run and re-reads a fresh baseline frame. Activity
//! inside a skipped run is inferred, not measured — a deliberate trade of
//! accuracy for decode cost on long active stretches.

use std::sync::atomic::{AtomicBool, Ordering};

use scrubmark_common::error::{ScrubmarkError, ScrubmarkResult};

use crate::diff::{frames_differ, Frame};
use crate::session::{ScanConfig, ScanOutcome};
use crate::source::FrameSource;
use crate::strip::{ActivityState, ActivityStrip};

/// The video activity scanner.
pub struct VideoActivityScanner {
    config: ScanConfig,
}

impl VideoActivityScanner {
    /// Create a scanner with the given tuning.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Create a scanner with default tuning.
    pub fn with_defaults() -> Self {
        Self::new(ScanConfig::default())
    }

    /// Populate the video strip by diffing consecutive frames.
    ///
    /// Frame 0 is inactive by definition: it has no predecessor to diff
    /// against. Malformed frames (wrong channel count, size drift against
    /// the declared dimensions, premature end of stream) abort the scan;
    /// they indicate an upstream decoder fault, not a degraded mode. A
    /// cancelled scan returns cleanly with trailing entries left
    /// `Uninitialized`.
    pub fn scan(
        &self,
        source: &mut dyn FrameSource,
        strip: &ActivityStrip,
        stop: &AtomicBool,
    ) -> ScrubmarkResult<ScanOutcome> {
        let num_frames = strip.len();
        let window = self.config.coalesce_window(num_frames);
        let poll = self.config.stop_poll_interval.max(1) as usize;
        let threshold = self.config.video_diff_threshold;

        tracing::debug!(num_frames, window, threshold, "Scanning video activity");

        source.seek(0)?;
        let mut prev = self.read_frame(source, 0)?;
        self.check_frame(&prev, None, source)?;
        strip.set(0, ActivityState::Inactive);

        let mut i = 1;
        while i < num_frames {
            // Periodic cooperative stop check.
            if i % poll == 0 && stop.load(Ordering::Relaxed) {
                tracing::info!(frames_scanned = i, "Video scan cancelled");
                return Ok(ScanOutcome::Cancelled);
            }

            let frame = self.read_frame(source, i)?;
            self.check_frame(&frame, Some(&prev), source)?;

            let active = frames_differ(&frame, &prev, threshold);
            strip.set(
                i,
                if active {
                    ActivityState::Active
                } else {
                    ActivityState::Inactive
                },
            );

            if active && window > 0 {
                // Assume the next frames also contain activity and skip
                // decoding them.
                let run_end = (i + window).min(num_frames - 1);
                for j in (i + 1)..=run_end {
                    strip.set(j, ActivityState::Active);
                }
                i = run_end + 1;

                if i < num_frames {
                    // The frame after the run becomes the new comparison
                    // baseline. It is written inactive without diffing it
                    // against its true predecessor.
                    strip.set(i, ActivityState::Inactive);
                    source.seek(i)?;
                    prev = self.read_frame(source, i)?;
                    self.check_frame(&prev, None, source)?;
                    i += 1;
                }
                continue;
            }

            prev = frame;
            i += 1;
        }

        if strip.has_uninitialized() {
            return Err(ScrubmarkError::scan(
                "video scan finished with unvisited frames; the strip index arithmetic is broken",
            ));
        }

        Ok(ScanOutcome::Completed)
    }

    fn read_frame(&self, source: &mut dyn FrameSource, index: usize) -> ScrubmarkResult<Frame> {
        source.read_next()?.ok_or_else(|| {
            ScrubmarkError::decode(format!(
                "frame stream ended early at frame {index} of {}",
                source.num_frames()
            ))
        })
    }

    fn check_frame(
        &self,
        frame: &Frame,
        prev: Option<&Frame>,
        source: &dyn FrameSource,
    ) -> ScrubmarkResult<()> {
        if frame.channels() != 3 {
            return Err(ScrubmarkError::decode(format!(
                "expected three color channels in the video frame, found {}",
                frame.channels()
            )));
        }

        let declared = (source.width() as usize) * (source.height() as usize);
        if frame.pixel_count() != declared {
            return Err(ScrubmarkError::decode(format!(
                "frame has {} pixels but the video declares {declared}",
                frame.pixel_count()
            )));
        }

        if let Some(prev) = prev {
            if frame.channels() != prev.channels() || frame.pixel_count() != prev.pixel_count() {
                return Err(ScrubmarkError::decode(
                    "mismatched frames while reading the video",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// Replays a fixed frame list, recording reads and seeks. Optionally
    /// trips the shared stop flag when a chosen frame index is read.
    struct ScriptedFrames {
        frames: Vec<Frame>,
        width: u32,
        height: u32,
        cursor: usize,
        reads: Vec<usize>,
        seeks: Vec<usize>,
        trip: Option<(usize, Arc<AtomicBool>)>,
    }

    impl ScriptedFrames {
        fn new(frames: Vec<Frame>) -> Self {
            let (width, height) = (frames[0].width(), frames[0].height());
            Self {
                frames,
                width,
                height,
                cursor: 0,
                reads: Vec::new(),
                seeks: Vec::new(),
                trip: None,
            }
        }
    }

    impl FrameSource for ScriptedFrames {
        fn num_frames(&self) -> usize {
            self.frames.len()
        }

        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn seek(&mut self, frame_index: usize) -> ScrubmarkResult<()> {
            self.seeks.push(frame_index);
            self.cursor = frame_index;
            Ok(())
        }

        fn read_next(&mut self) -> ScrubmarkResult<Option<Frame>> {
            let Some(frame) = self.frames.get(self.cursor) else {
                return Ok(None);
            };
            if let Some((at, ref flag)) = self.trip {
                if self.cursor == at {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            self.reads.push(self.cursor);
            self.cursor += 1;
            Ok(Some(frame.clone()))
        }
    }

    fn solid(value: u8) -> Frame {
        Frame::new(2, 2, 3, vec![value; 12])
    }

    fn scan(source: &mut ScriptedFrames) -> (ActivityStrip, ScrubmarkResult<ScanOutcome>) {
        let strip = ActivityStrip::new(source.num_frames());
        let scanner = VideoActivityScanner::with_defaults();
        let result = scanner.scan(source, &strip, &AtomicBool::new(false));
        (strip, result)
    }

    #[test]
    fn first_frame_is_always_inactive() {
        let mut source = ScriptedFrames::new(vec![solid(0), solid(255)]);
        let (strip, result) = scan(&mut source);

        assert_eq!(result.unwrap(), ScanOutcome::Completed);
        assert_eq!(strip.state_at(0), ActivityState::Inactive);
        assert!(strip.is_active_at(1));
    }

    #[test]
    fn still_video_has_no_activity() {
        let mut source = ScriptedFrames::new(vec![solid(90); 20]);
        let (strip, result) = scan(&mut source);

        assert_eq!(result.unwrap(), ScanOutcome::Completed);
        assert!((0..20).all(|i| strip.state_at(i) == ActivityState::Inactive));
        assert!(!strip.has_uninitialized());
    }

    #[test]
    fn difference_below_threshold_stays_inactive() {
        let mut source = ScriptedFrames::new(vec![solid(100), solid(130), solid(161)]);
        let (strip, result) = scan(&mut source);

        assert_eq!(result.unwrap(), ScanOutcome::Completed);
        // 130 is exactly 30 away: not enough. 161 is 31 away: activity.
        assert_eq!(strip.state_at(1), ActivityState::Inactive);
        assert!(strip.is_active_at(2));
    }

    #[test]
    fn coalescing_skips_decoding_and_resets_the_baseline() {
        // 150 frames gives a window of 3. One changed frame at index 5.
        let mut frames = vec![solid(0); 150];
        for frame in frames.iter_mut().skip(5) {
            *frame = solid(255);
        }
        let mut source = ScriptedFrames::new(frames);
        let (strip, result) = scan(&mut source);

        assert_eq!(result.unwrap(), ScanOutcome::Completed);
        // Trigger plus the coalesced run.
        for i in 5..=8 {
            assert!(strip.is_active_at(i), "frame {i}");
        }
        // Baseline after the run is forced inactive and re-read, and the
        // scan continues comparing against it.
        assert_eq!(strip.state_at(9), ActivityState::Inactive);
        assert_eq!(strip.state_at(10), ActivityState::Inactive);
        // Frames inside the run were never decoded.
        assert!(!source.reads.contains(&6));
        assert!(!source.reads.contains(&7));
        assert!(!source.reads.contains(&8));
        assert_eq!(source.seeks, vec![0, 9]);
        assert!(!strip.has_uninitialized());
    }

    #[test]
    fn run_clamped_at_end_of_video_still_populates_strip() {
        // Window of 3; trigger at the second-to-last frame.
        let mut frames = vec![solid(0); 150];
        frames[148] = solid(255);
        frames[149] = solid(255);
        let mut source = ScriptedFrames::new(frames);
        let (strip, result) = scan(&mut source);

        assert_eq!(result.unwrap(), ScanOutcome::Completed);
        assert!(strip.is_active_at(148));
        assert!(strip.is_active_at(149));
        assert!(!strip.has_uninitialized());
    }

    #[test]
    fn wrong_channel_count_is_fatal() {
        let bad = Frame::new(2, 2, 1, vec![0; 4]);
        let mut source = ScriptedFrames::new(vec![solid(0), bad]);
        let (_, result) = scan(&mut source);

        assert!(matches!(result, Err(ScrubmarkError::Decode { .. })));
    }

    #[test]
    fn frame_size_drift_is_fatal() {
        // Declared dimensions come from frame 0 (2x2); frame 1 is 3x2.
        let drifted = Frame::new(3, 2, 3, vec![0; 18]);
        let mut source = ScriptedFrames::new(vec![solid(0), drifted]);
        let (_, result) = scan(&mut source);

        assert!(matches!(result, Err(ScrubmarkError::Decode { .. })));
    }

    #[test]
    fn premature_end_of_stream_is_fatal() {
        let mut source = ScriptedFrames::new(vec![solid(0), solid(0)]);
        // Claim more frames than the stream can deliver.
        let strip = ActivityStrip::new(4);
        let scanner = VideoActivityScanner::with_defaults();
        let result = scanner.scan(&mut source, &strip, &AtomicBool::new(false));

        assert!(matches!(result, Err(ScrubmarkError::Decode { .. })));
    }

    #[test]
    fn stop_mid_scan_returns_cleanly_at_the_poll_boundary() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = ScriptedFrames::new(vec![solid(50); 1000]);
        source.trip = Some((50, stop.clone()));

        let strip = ActivityStrip::new(1000);
        let scanner = VideoActivityScanner::with_defaults();
        let result = scanner.scan(&mut source, &strip, &stop);

        assert_eq!(result.unwrap(), ScanOutcome::Cancelled);
        // Flag trips while reading frame 50; observed at the 200-frame poll.
        assert_eq!(strip.state_at(199), ActivityState::Inactive);
        assert_eq!(strip.state_at(200), ActivityState::Uninitialized);
        assert!(strip.has_uninitialized());
    }
}
