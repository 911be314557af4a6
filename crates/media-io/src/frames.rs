//! A seekable frame source over an ffmpeg rawvideo pipe.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use scrubmark_activity_core::{Frame, FrameSource};
use scrubmark_common::error::{ScrubmarkError, ScrubmarkResult};

use crate::probe::VideoInfo;

/// Decodes a video to interleaved `rgb24` frames by streaming ffmpeg's
/// rawvideo output. Sequential reads consume the pipe; a seek restarts the
/// decoder at the requested frame's timestamp with an accurate input seek.
pub struct PipeFrameSource {
    path: PathBuf,
    info: VideoInfo,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl PipeFrameSource {
    /// Open a decoder pipe positioned at frame 0.
    pub fn open(path: &Path, info: VideoInfo) -> ScrubmarkResult<Self> {
        if !path.exists() {
            return Err(ScrubmarkError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let mut source = Self {
            path: path.to_path_buf(),
            info,
            child: None,
            stdout: None,
        };
        source.spawn_at(0)?;
        Ok(source)
    }

    /// Size of one decoded frame in bytes.
    fn frame_bytes(&self) -> usize {
        (self.info.width as usize) * (self.info.height as usize) * 3
    }

    /// (Re)start the decoder so the next read returns `frame_index`.
    fn spawn_at(&mut self, frame_index: usize) -> ScrubmarkResult<()> {
        self.shutdown_child();

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-v").arg("error");

        if frame_index > 0 {
            // Input-side seek with -accurate_seek decodes from the prior
            // keyframe and discards up to the requested timestamp.
            let offset_secs = frame_index as f64 / self.info.fps;
            cmd.arg("-accurate_seek")
                .arg("-ss")
                .arg(format!("{offset_secs:.6}"));
        }

        cmd.arg("-i")
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-an", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            ScrubmarkError::decode(format!("failed to start the ffmpeg decoder: {e}"))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScrubmarkError::decode("ffmpeg decoder has no stdout pipe"))?;

        tracing::debug!(frame_index, "Started rawvideo decoder");
        self.child = Some(child);
        self.stdout = Some(BufReader::new(stdout));
        Ok(())
    }

    fn shutdown_child(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl FrameSource for PipeFrameSource {
    fn num_frames(&self) -> usize {
        self.info.num_frames
    }

    fn width(&self) -> u32 {
        self.info.width
    }

    fn height(&self) -> u32 {
        self.info.height
    }

    fn seek(&mut self, frame_index: usize) -> ScrubmarkResult<()> {
        self.spawn_at(frame_index)
    }

    fn read_next(&mut self) -> ScrubmarkResult<Option<Frame>> {
        let frame_bytes = self.frame_bytes();
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| ScrubmarkError::decode("frame source is not open"))?;

        let mut data = vec![0u8; frame_bytes];
        match stdout.read_exact(&mut data) {
            Ok(()) => Ok(Some(Frame::new(self.info.width, self.info.height, 3, data))),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(ScrubmarkError::decode(format!(
                "failed to read a decoded frame: {e}"
            ))),
        }
    }
}

impl Drop for PipeFrameSource {
    fn drop(&mut self) {
        self.shutdown_child();
    }
}
