//! Per-frame activity strips and their query surface.
//!
//! A strip holds one activity state per video frame, index-aligned with
//! frame numbers. Cells are atomic so the owning scanner task can write
//! while other tasks query already-written positions; a cell that has not
//! been written yet reads [`ActivityState::Uninitialized`], which callers
//! must treat as "unknown" rather than "inactive".

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Classification of a single frame on one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActivityState {
    /// Not yet visited by the scanner.
    Uninitialized = 0,
    /// The scan could not run for this track (e.g. no audio available).
    NoData = 1,
    /// Visited, no activity found.
    Inactive = 2,
    /// Visited, activity found (directly or by coalescing).
    Active = 3,
}

impl ActivityState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ActivityState::NoData,
            2 => ActivityState::Inactive,
            3 => ActivityState::Active,
            _ => ActivityState::Uninitialized,
        }
    }
}

/// Which activity track a query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Video,
    Audio,
    /// Active if either the video or the audio strip is active.
    Either,
}

/// A contiguous run of `Active` frames on one track, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySegment {
    pub start: usize,
    pub end: usize,
}

/// One per-frame activity strip.
///
/// Length is fixed at construction to the video's frame count. Entries
/// transition `Uninitialized -> {NoData | Inactive | Active}` exactly once
/// and never revert; the owning scanner is the only writer.
pub struct ActivityStrip {
    cells: Vec<AtomicU8>,
}

impl ActivityStrip {
    /// Allocate a strip with every entry `Uninitialized`.
    ///
    /// Panics if `num_frames` is zero; a video with no frames has nothing
    /// to scan and indicates a caller contract violation.
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "activity strip requires at least one frame");
        let mut cells = Vec::with_capacity(num_frames);
        cells.resize_with(num_frames, || AtomicU8::new(ActivityState::Uninitialized as u8));
        Self { cells }
    }

    /// Number of frames covered by this strip.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// State at a frame index. Out-of-range indices are a caller fault.
    pub fn state_at(&self, index: usize) -> ActivityState {
        assert!(
            index < self.cells.len(),
            "frame index {index} out of range (strip has {} frames)",
            self.cells.len()
        );
        ActivityState::from_u8(self.cells[index].load(Ordering::Acquire))
    }

    /// True iff the frame has been scanned and classified `Active`.
    pub fn is_active_at(&self, index: usize) -> bool {
        self.state_at(index) == ActivityState::Active
    }

    /// Write a frame's classification. Writes are one-shot per cell.
    pub fn set(&self, index: usize, state: ActivityState) {
        assert!(
            index < self.cells.len(),
            "frame index {index} out of range (strip has {} frames)",
            self.cells.len()
        );
        debug_assert!(
            self.state_at(index) == ActivityState::Uninitialized,
            "activity state for frame {index} written twice"
        );
        self.cells[index].store(state as u8, Ordering::Release);
    }

    /// Fill the whole strip with one state (degraded-mode `NoData` fill).
    pub fn fill(&self, state: ActivityState) {
        for cell in &self.cells {
            cell.store(state as u8, Ordering::Release);
        }
    }

    /// True if any entry is still `Uninitialized`.
    pub fn has_uninitialized(&self) -> bool {
        self.cells
            .iter()
            .any(|c| c.load(Ordering::Acquire) == ActivityState::Uninitialized as u8)
    }

    /// Walk backward from a frame known to be `Active` to the first frame
    /// of the contiguous active run containing it. Returns 0 when the run
    /// extends to the beginning of the strip.
    ///
    /// Calling this on a non-`Active` index is a caller fault.
    pub fn find_segment_start(&self, index: usize) -> usize {
        assert!(
            self.is_active_at(index),
            "find_segment_start called on a frame that is not active"
        );

        let mut start = index;
        while start > 0 && self.is_active_at(start - 1) {
            start -= 1;
        }
        start
    }

    /// All contiguous `Active` runs, in order.
    pub fn segments(&self) -> Vec<ActivitySegment> {
        collect_segments(self.len(), |i| self.is_active_at(i))
    }
}

/// Collect contiguous runs of indices for which `is_active` holds.
pub(crate) fn collect_segments(
    len: usize,
    is_active: impl Fn(usize) -> bool,
) -> Vec<ActivitySegment> {
    let mut segments = Vec::new();
    let mut run_start: Option<usize> = None;

    for i in 0..len {
        match (is_active(i), run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                segments.push(ActivitySegment { start, end: i - 1 });
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        segments.push(ActivitySegment {
            start,
            end: len - 1,
        });
    }

    segments
}
