//! Core of the audioshelf audiobook player.
/// Per-user application directory resolution.
pub mod app_dirs;
/// Locations of the `ffmpeg` and `ffprobe` helpers.
pub mod external_tools;
/// Tracing subscriber setup.
pub mod logging;
/// Playback engine, session controller and per-title details.
pub mod playback;
/// Persisted positions, shelf, bookmarks and preferences.
pub mod session;
/// Live level visualizer.
pub mod visualizer;
