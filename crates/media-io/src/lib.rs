//! Scrubmark Media I/O
//!
//! FFmpeg-backed implementations of the activity core's collaborator
//! seams:
//! - **Probing:** ffprobe-derived video dimensions, frame rate, and count
//! - **Frames:** a seekable frame source over an ffmpeg rawvideo pipe
//! - **Audio:** sample extraction through ffmpeg into a scratch WAV file
//!
//! Everything here assumes ffmpeg/ffprobe are installed and callable
//! globally; `check_ffmpeg`/`check_ffprobe` verify that up front.

pub mod audio;
pub mod frames;
pub mod probe;

pub use audio::PcmWavExtractor;
pub use frames::PipeFrameSource;
pub use probe::{check_ffmpeg, check_ffprobe, probe_video, VideoInfo};
