use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use thiserror::Error;

use crate::external_tools::{ffprobe_program, hide_console};

/// A chapter mark inside a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub offset_ms: u64,
    pub title: String,
}

impl Chapter {
    /// List label in the form `M:SS  Title`.
    pub fn label(&self) -> String {
        let minutes = self.offset_ms / 60_000;
        let seconds = (self.offset_ms / 1000) % 60;
        format!("{minutes}:{seconds:02}  {}", self.title)
    }
}

#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("Failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("{} exited with {status} for {}", program.display(), path.display())]
    Exit {
        program: PathBuf,
        status: std::process::ExitStatus,
        path: PathBuf,
    },
    #[error("Unreadable chapter listing: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of chapter marks for a file.
pub trait ChapterProber {
    /// Chapters in ascending offset order. Files without chapters yield an
    /// empty list.
    fn probe(&self, file: &Path) -> Result<Vec<Chapter>, ChapterError>;
}

/// Chapter marks read by running `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeChapterProber {
    program: PathBuf,
}

impl FfprobeChapterProber {
    pub fn new() -> Self {
        Self {
            program: ffprobe_program(),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, file: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_chapters"])
            .arg(file)
            .stdin(Stdio::null())
            .stderr(Stdio::null());
        hide_console(&mut command);
        command
    }
}

impl Default for FfprobeChapterProber {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterProber for FfprobeChapterProber {
    fn probe(&self, file: &Path) -> Result<Vec<Chapter>, ChapterError> {
        let output = self
            .command(file)
            .output()
            .map_err(|source| ChapterError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ChapterError::Exit {
                program: self.program.clone(),
                status: output.status,
                path: file.to_path_buf(),
            });
        }
        parse_chapters(&output.stdout)
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    chapters: Vec<ProbeChapter>,
}

#[derive(Deserialize)]
struct ProbeChapter {
    start_time: StartTime,
    #[serde(default)]
    tags: ProbeTags,
}

/// ffprobe prints `start_time` as a decimal string; accept bare numbers too.
#[derive(Deserialize)]
#[serde(untagged)]
enum StartTime {
    Text(String),
    Number(f64),
}

#[derive(Deserialize, Default)]
struct ProbeTags {
    title: Option<String>,
}

/// Parse `ffprobe -show_chapters` JSON output.
///
/// Chapters with an unreadable start time are skipped; untitled chapters are
/// named after their position in the listing.
pub fn parse_chapters(json: &[u8]) -> Result<Vec<Chapter>, ChapterError> {
    let output: ProbeOutput = serde_json::from_slice(json)?;
    let mut chapters: Vec<Chapter> = output
        .chapters
        .into_iter()
        .enumerate()
        .filter_map(|(index, chapter)| {
            let seconds = match chapter.start_time {
                StartTime::Text(text) => text.trim().parse::<f64>().ok()?,
                StartTime::Number(value) => value,
            };
            if !seconds.is_finite() {
                return None;
            }
            let title = chapter
                .tags
                .title
                .unwrap_or_else(|| format!("Chapter {}", index + 1));
            Some(Chapter {
                offset_ms: (seconds.max(0.0) * 1000.0) as u64,
                title,
            })
        })
        .collect();
    chapters.sort_by_key(|chapter| chapter.offset_ms);
    Ok(chapters)
}

/// First chapter starting strictly after `position_ms`.
pub fn next_after(chapters: &[Chapter], position_ms: u64) -> Option<&Chapter> {
    chapters
        .iter()
        .find(|chapter| chapter.offset_ms > position_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "chapters": [
            {"id": 1, "start_time": "1800.500000", "tags": {"title": "Part Two"}},
            {"id": 0, "start_time": "0.000000", "tags": {"title": "Opening"}},
            {"id": 2, "start_time": "3600.000000"}
        ]
    }"#;

    #[test]
    fn listing_is_sorted_and_converted_to_ms() {
        let chapters = parse_chapters(LISTING.as_bytes()).unwrap();
        let offsets: Vec<u64> = chapters.iter().map(|c| c.offset_ms).collect();
        assert_eq!(offsets, vec![0, 1_800_500, 3_600_000]);
        assert_eq!(chapters[0].title, "Opening");
        assert_eq!(chapters[2].title, "Chapter 3");
    }

    #[test]
    fn file_without_chapters_yields_empty_list() {
        assert!(parse_chapters(b"{}").unwrap().is_empty());
        assert!(parse_chapters(br#"{"chapters": []}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_listing_is_an_error() {
        assert!(matches!(
            parse_chapters(b"not json"),
            Err(ChapterError::Parse(_))
        ));
    }

    #[test]
    fn next_after_skips_current_chapter() {
        let chapters = parse_chapters(LISTING.as_bytes()).unwrap();
        assert_eq!(next_after(&chapters, 0).unwrap().offset_ms, 1_800_500);
        assert_eq!(next_after(&chapters, 1_800_500).unwrap().offset_ms, 3_600_000);
        assert!(next_after(&chapters, 3_600_000).is_none());
    }

    #[test]
    fn label_shows_minutes_and_seconds() {
        let chapter = Chapter {
            offset_ms: 3_725_000,
            title: "Finale".into(),
        };
        assert_eq!(chapter.label(), "62:05  Finale");
    }

    #[test]
    fn missing_prober_reports_spawn_error() {
        let prober = FfprobeChapterProber::with_program("audioshelf-no-such-ffprobe");
        assert!(matches!(
            prober.probe(Path::new("/nowhere.m4b")),
            Err(ChapterError::Spawn { .. })
        ));
    }
}
