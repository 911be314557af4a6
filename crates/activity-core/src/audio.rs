//! Audio activity scanning.
//!
//! Works through the whole sample stream once to derive a loudness
//! threshold, then maps each video frame to a representative sample and
//! classifies it. Frames whose sample rises above the threshold pull the
//! following frames into the active run (coalescing), so brief sounds
//! still produce clickable segments on the timeline strip.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::session::{ScanConfig, ScanOutcome};
use crate::source::{NoticeSender, SampleSource, ScanNotice};
use crate::strip::{ActivityState, ActivityStrip};

/// The audio activity scanner.
pub struct AudioActivityScanner {
    config: ScanConfig,
}

impl AudioActivityScanner {
    /// Create a scanner with the given tuning.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Create a scanner with default tuning.
    pub fn with_defaults() -> Self {
        Self::new(ScanConfig::default())
    }

    /// Populate the audio strip from a sample stream.
    ///
    /// An absent or empty stream is the expected degraded mode: the strip
    /// is filled with `NoData`, a notice is emitted, and the scan reports
    /// [`ScanOutcome::NoAudio`]. A cancelled scan leaves trailing entries
    /// `Uninitialized`.
    pub fn scan(
        &self,
        samples: Option<&dyn SampleSource>,
        strip: &ActivityStrip,
        stop: &AtomicBool,
        notices: Option<&NoticeSender>,
    ) -> ScanOutcome {
        let num_frames = strip.len();

        let Some(samples) = samples.filter(|s| s.num_samples() > 0) else {
            tracing::warn!("No usable audio; marking the audio strip as having no data");
            strip.fill(ActivityState::NoData);
            if let Some(tx) = notices {
                let _ = tx.send(ScanNotice::AudioUnavailable);
            }
            return ScanOutcome::NoAudio;
        };

        let num_samples = samples.num_samples();
        let threshold = loudness_threshold(samples, self.config.audio_threshold_scale);
        let window = self.config.coalesce_window(num_frames);
        let poll = self.config.stop_poll_interval.max(1) as usize;

        tracing::debug!(
            num_frames,
            num_samples,
            threshold,
            window,
            "Scanning audio activity"
        );

        let mut i = 0;
        while i < num_frames {
            // Periodic cooperative stop check.
            if i % poll == 0 && stop.load(Ordering::Relaxed) {
                tracing::info!(frames_scanned = i, "Audio scan cancelled");
                return ScanOutcome::Cancelled;
            }

            let sample_index = representative_sample(i, num_frames, num_samples);
            let loud = (samples.sample_at(sample_index) as f64).abs() > threshold.abs();
            strip.set(
                i,
                if loud {
                    ActivityState::Active
                } else {
                    ActivityState::Inactive
                },
            );

            if loud && window > 0 {
                // A loud sample pulls the next frames into the run; resume
                // evaluation after it.
                let run_end = (i + window).min(num_frames - 1);
                for j in (i + 1)..=run_end {
                    strip.set(j, ActivityState::Active);
                }
                i = run_end + 1;
            } else {
                i += 1;
            }
        }

        ScanOutcome::Completed
    }
}

/// Loudness cutoff for the whole track: `(peak - average) * scale`.
///
/// The average is the arithmetic mean of the signed samples, the peak the
/// maximum absolute amplitude, both from one linear pass. The formula is a
/// long-standing tunable heuristic, not a percentile.
fn loudness_threshold(samples: &dyn SampleSource, scale: f64) -> f64 {
    let mut sum: i64 = 0;
    let mut peak: i64 = 0;

    for i in 0..samples.num_samples() {
        let sample = samples.sample_at(i) as i64;
        sum += sample;
        peak = peak.max(sample.abs());
    }

    let average = sum as f64 / samples.num_samples() as f64;
    (peak as f64 - average) * scale
}

/// Map a frame index to its representative sample by linear time scaling.
fn representative_sample(frame: usize, num_frames: usize, num_samples: usize) -> usize {
    let scaled = (frame as f64 * num_samples as f64 / num_frames as f64).round() as usize;
    scaled.min(num_samples - 1)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::source::MemorySamples;

    fn scan_samples(samples: Vec<i32>, num_frames: usize) -> (ActivityStrip, ScanOutcome) {
        let strip = ActivityStrip::new(num_frames);
        let scanner = AudioActivityScanner::with_defaults();
        let source = MemorySamples::new(samples);
        let outcome = scanner.scan(Some(&source), &strip, &AtomicBool::new(false), None);
        (strip, outcome)
    }

    #[test]
    fn missing_audio_fills_strip_with_nodata() {
        let strip = ActivityStrip::new(20);
        let scanner = AudioActivityScanner::with_defaults();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let outcome = scanner.scan(None, &strip, &AtomicBool::new(false), Some(&tx));

        assert_eq!(outcome, ScanOutcome::NoAudio);
        assert!((0..20).all(|i| strip.state_at(i) == ActivityState::NoData));
        assert_eq!(rx.try_recv().unwrap(), ScanNotice::AudioUnavailable);
    }

    #[test]
    fn empty_sample_stream_counts_as_missing_audio() {
        let strip = ActivityStrip::new(5);
        let scanner = AudioActivityScanner::with_defaults();
        let source = MemorySamples::new(vec![]);

        let outcome = scanner.scan(Some(&source), &strip, &AtomicBool::new(false), None);

        assert_eq!(outcome, ScanOutcome::NoAudio);
        assert!((0..5).all(|i| strip.state_at(i) == ActivityState::NoData));
    }

    #[test]
    fn loud_sample_marks_its_frame_active() {
        // 10 frames over 100 samples; frame i maps to sample 10 * i.
        let mut samples = vec![0; 100];
        samples[50] = 10_000;
        let (strip, outcome) = scan_samples(samples, 10);

        assert_eq!(outcome, ScanOutcome::Completed);
        for i in 0..10 {
            let expected = if i == 5 {
                ActivityState::Active
            } else {
                ActivityState::Inactive
            };
            assert_eq!(strip.state_at(i), expected, "frame {i}");
        }
    }

    #[test]
    fn no_coalescing_below_fifty_frames() {
        let mut samples = vec![0; 40];
        samples[20] = 8_000;
        let (strip, _) = scan_samples(samples, 40);

        assert!(strip.is_active_at(20));
        assert_eq!(strip.state_at(21), ActivityState::Inactive);
    }

    #[test]
    fn active_frame_pulls_following_frames_into_run() {
        // 100 frames over 100 samples gives a coalescing window of 2.
        let mut samples = vec![0; 100];
        samples[10] = 8_000;
        let (strip, _) = scan_samples(samples, 100);

        assert!(strip.is_active_at(10));
        assert!(strip.is_active_at(11));
        assert!(strip.is_active_at(12));
        assert_eq!(strip.state_at(13), ActivityState::Inactive);
        assert!(!strip.has_uninitialized());
    }

    #[test]
    fn run_is_clamped_at_the_final_frame() {
        let mut samples = vec![0; 100];
        samples[99] = 8_000;
        let (strip, outcome) = scan_samples(samples, 100);

        assert_eq!(outcome, ScanOutcome::Completed);
        assert!(strip.is_active_at(99));
        assert!(!strip.has_uninitialized());
    }

    #[test]
    fn threshold_scales_linearly_with_amplitude() {
        let quiet: Vec<i32> = vec![0, 40, -30, 900, 12, -7, 600, 3];
        let loud: Vec<i32> = quiet.iter().map(|s| s * 10).collect();

        let t_quiet = loudness_threshold(&MemorySamples::new(quiet.clone()), 0.001);
        let t_loud = loudness_threshold(&MemorySamples::new(loud.clone()), 0.001);
        assert!((t_loud - 10.0 * t_quiet).abs() < 1e-9);

        let (strip_quiet, _) = scan_samples(quiet, 8);
        let (strip_loud, _) = scan_samples(loud, 8);
        for i in 0..8 {
            assert_eq!(strip_quiet.state_at(i), strip_loud.state_at(i), "frame {i}");
        }
    }

    #[test]
    fn stop_flag_set_before_scan_writes_nothing() {
        let strip = ActivityStrip::new(300);
        let scanner = AudioActivityScanner::with_defaults();
        let source = MemorySamples::new(vec![0; 300]);
        let stop = AtomicBool::new(true);

        let outcome = scanner.scan(Some(&source), &strip, &stop, None);

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert!(strip.has_uninitialized());
        assert_eq!(strip.state_at(0), ActivityState::Uninitialized);
    }

    /// Sets the shared stop flag when a chosen sample index is read,
    /// simulating a stop request arriving mid-scan.
    struct TripwireSamples {
        samples: Vec<i32>,
        stop: Arc<AtomicBool>,
        trip_at: usize,
    }

    impl SampleSource for TripwireSamples {
        fn num_samples(&self) -> usize {
            self.samples.len()
        }

        fn sample_at(&self, index: usize) -> i32 {
            if index == self.trip_at {
                self.stop.store(true, Ordering::SeqCst);
            }
            self.samples[index]
        }
    }

    #[test]
    fn stop_observed_at_next_poll_boundary() {
        let stop = Arc::new(AtomicBool::new(false));
        let source = TripwireSamples {
            samples: vec![0; 1000],
            stop: stop.clone(),
            trip_at: 50,
        };
        let strip = ActivityStrip::new(1000);
        let scanner = AudioActivityScanner::with_defaults();

        let outcome = scanner.scan(Some(&source), &strip, &stop, None);

        assert_eq!(outcome, ScanOutcome::Cancelled);
        // The flag trips at frame 50 and is observed at the 200-frame poll.
        assert_eq!(strip.state_at(199), ActivityState::Inactive);
        assert_eq!(strip.state_at(200), ActivityState::Uninitialized);
    }

    proptest! {
        #[test]
        fn uninterrupted_scan_populates_every_frame(
            samples in prop::collection::vec(-20_000i32..20_000, 1..400),
            num_frames in 1usize..300,
        ) {
            let strip = ActivityStrip::new(num_frames);
            let scanner = AudioActivityScanner::with_defaults();
            let source = MemorySamples::new(samples);

            let outcome = scanner.scan(Some(&source), &strip, &AtomicBool::new(false), None);

            prop_assert_eq!(outcome, ScanOutcome::Completed);
            prop_assert!(!strip.has_uninitialized());
        }

        #[test]
        fn active_runs_span_at_least_the_coalescing_window(
            samples in prop::collection::vec(prop_oneof![Just(0i32), Just(15_000i32)], 60..250),
        ) {
            let num_frames = samples.len();
            let window = num_frames / 50;
            prop_assume!(window > 0);

            let strip = ActivityStrip::new(num_frames);
            let scanner = AudioActivityScanner::with_defaults();
            let source = MemorySamples::new(samples);
            scanner.scan(Some(&source), &strip, &AtomicBool::new(false), None);

            // Every maximal active run that does not reach the final frame
            // must cover the trigger frame plus the full coalescing window.
            for segment in strip.segments() {
                if segment.end < num_frames - 1 {
                    prop_assert!(segment.end - segment.start + 1 >= window + 1);
                }
            }
        }
    }
}
