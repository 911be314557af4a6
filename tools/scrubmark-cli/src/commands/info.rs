//! Show probed video information.

use std::path::PathBuf;

use scrubmark_media_io::{check_ffprobe, probe_video};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    check_ffprobe()?;

    let info =
        probe_video(&path).map_err(|e| anyhow::anyhow!("Failed to probe the video: {e}"))?;

    println!("Video: {}", path.display());
    println!("  Resolution: {}x{}", info.width, info.height);
    println!("  Frame rate: {:.3} fps", info.fps);
    println!("  Frames: {}", info.num_frames);
    println!("  Duration: {:.2}s", info.duration_secs);

    Ok(())
}
