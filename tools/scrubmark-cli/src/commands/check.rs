//! Check that the external tools are available.

use scrubmark_media_io::{check_ffmpeg, check_ffprobe};

pub fn run() -> anyhow::Result<()> {
    println!("Scrubmark System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;

    match check_ffmpeg() {
        Ok(()) => println!("[OK] ffmpeg is callable"),
        Err(e) => {
            all_ok = false;
            println!("[MISSING] ffmpeg: {e}");
        }
    }

    match check_ffprobe() {
        Ok(()) => println!("[OK] ffprobe is callable"),
        Err(e) => {
            all_ok = false;
            println!("[MISSING] ffprobe: {e}");
        }
    }

    println!();
    if all_ok {
        println!("All required tools are available. Scrubmark is ready.");
    } else {
        println!("Install FFmpeg and make sure it is on PATH; without it no video can be scanned.");
    }

    Ok(())
}
