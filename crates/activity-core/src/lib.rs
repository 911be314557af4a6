//! Scrubmark Activity Core
//!
//! Scans a recording once and classifies every video frame as active or
//! inactive on two independent tracks:
//! - **Video:** pixel-level differences against the previous frame
//! - **Audio:** sample amplitude against a whole-track loudness threshold
//!
//! The output is a pair of per-frame activity strips that a timeline
//! scrubber can query to jump between regions of interest.
//!
//! This crate is pure computation — no subprocesses, no file formats.
//! Decoded media arrives through the [`FrameSource`], [`SampleSource`], and
//! [`AudioExtractor`] seams; everything else is data in, data out.

pub mod audio;
pub mod diff;
pub mod session;
pub mod source;
pub mod strip;
pub mod video;

pub use audio::AudioActivityScanner;
pub use diff::{frames_differ, Frame};
pub use session::{ScanConfig, ScanOutcome, ScanSession};
pub use source::{
    AudioExtractor, FrameSource, MemorySamples, NoticeSender, SampleSource, ScanNotice,
};
pub use strip::{ActivitySegment, ActivityState, ActivityStrip, Track};
pub use video::VideoActivityScanner;
