//! Locations of the external helper programs.
//!
//! Both tools are optional. A missing `ffmpeg` only disables the level
//! visualizer and a missing `ffprobe` only disables chapters.

use std::path::PathBuf;

/// Overrides the `ffmpeg` executable used by the visualizer.
pub const FFMPEG_ENV: &str = "AUDIOSHELF_FFMPEG";
/// Overrides the `ffprobe` executable used for chapter lists.
pub const FFPROBE_ENV: &str = "AUDIOSHELF_FFPROBE";

pub fn ffmpeg_program() -> PathBuf {
    program_from_env(FFMPEG_ENV, "ffmpeg")
}

pub fn ffprobe_program() -> PathBuf {
    program_from_env(FFPROBE_ENV, "ffprobe")
}

fn program_from_env(var: &str, fallback: &str) -> PathBuf {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(fallback))
}

/// Keep helper processes from flashing a console window on Windows.
pub(crate) fn hide_console(command: &mut std::process::Command) {
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    {
        let _ = command;
    }
}
