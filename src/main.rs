//! Terminal front end for the audioshelf player.
//!
//! Opens the title given on the command line (or the one from the last
//! session) and reads transport commands from stdin, one per line.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use audioshelf::logging;
use audioshelf::playback::time_entry::format_hms;
use audioshelf::playback::{
    Advisory, POSITION_TICK, PlaybackEngine, PlaybackSessionController, RENDER_TICK, RodioEngine,
    SKIP_STEP_MS,
};
use audioshelf::session::{DataView, SessionStore};
use audioshelf::visualizer::{RenderMode, VisualizationPipeline};
use tracing::{info, warn};

const HELP: &str = "\
commands:
  open <path>        load a title
  play | pause | p   transport (p toggles)
  seek HH:MM:SS      jump to a timestamp
  ff | rw            skip 10 s forward or back
  next               next chapter
  chapters           list chapters
  chapter <n>        jump to chapter n
  mark <note>        bookmark the playhead
  marks              list bookmarks
  jump <n>           load bookmark n
  back               return to where the last jump started
  unmark <n> [n..]   delete bookmarks
  vol <0-200>        set volume
  shelf              list the shelf
  mode wave|bars|circle
  meter              toggle the level meter
  view [encoded]     show stored data
  export <path> | import <path> | wipe
  status | help | quit";

enum Command {
    Open(PathBuf),
    Play,
    Pause,
    Toggle,
    Seek(String),
    Skip(i64),
    NextChapter,
    Chapters,
    Chapter(usize),
    Mark(String),
    Marks,
    Jump(usize),
    Back,
    Unmark(Vec<usize>),
    Volume(String),
    Shelf,
    Mode(RenderMode),
    Meter,
    View(DataView),
    Export(PathBuf),
    Import(PathBuf),
    Wipe,
    Status,
    Help,
    Quit,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let store = SessionStore::load_default()?;
    let engine = RodioEngine::new()?;
    let pipeline = VisualizationPipeline::with_ffmpeg();
    let mut controller = PlaybackSessionController::new(engine, store, pipeline);

    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            if let Err(err) = controller.open(&path) {
                eprintln!("{err}");
            }
        }
        None => {
            if let Some(advisory) = controller.resume_last_opened() {
                println!("{advisory}");
            }
        }
    }
    print_status(&controller);

    run(&mut controller, spawn_stdin_reader());
    controller.close();
    info!("Exiting");
    Ok(())
}

/// Read stdin on its own thread so the control loop keeps ticking.
fn spawn_stdin_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        warn!("Command input unavailable: {err}");
    }
    receiver
}

fn run(controller: &mut PlaybackSessionController<RodioEngine>, commands: Receiver<String>) {
    let mut meter = false;
    let mut last_tick = Instant::now();
    loop {
        match commands.recv_timeout(RENDER_TICK) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_command(line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Meter) => meter = !meter,
                    Ok(command) => execute(controller, command),
                    Err(message) => println!("{message}"),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if last_tick.elapsed() >= POSITION_TICK {
            controller.tick();
            last_tick = Instant::now();
        }
        if meter {
            draw_meter(controller);
        }
    }
}

fn parse_command(line: &str) -> Result<Command, String> {
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((line, ""));
    let index = |text: &str| {
        text.parse::<usize>()
            .map_err(|_| format!("Expected a number, got {text:?}"))
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "open" if !rest.is_empty() => Command::Open(PathBuf::from(rest)),
        "play" => Command::Play,
        "pause" => Command::Pause,
        "p" => Command::Toggle,
        "seek" => Command::Seek(rest.to_string()),
        "ff" => Command::Skip(SKIP_STEP_MS),
        "rw" => Command::Skip(-SKIP_STEP_MS),
        "next" => Command::NextChapter,
        "chapters" => Command::Chapters,
        "chapter" => Command::Chapter(index(rest)?),
        "mark" => Command::Mark(rest.to_string()),
        "marks" => Command::Marks,
        "jump" => Command::Jump(index(rest)?),
        "back" => Command::Back,
        "unmark" => Command::Unmark(
            rest.split_whitespace()
                .map(index)
                .collect::<Result<_, _>>()?,
        ),
        "vol" => Command::Volume(rest.to_string()),
        "shelf" => Command::Shelf,
        "mode" => Command::Mode(rest.parse()?),
        "meter" => Command::Meter,
        "view" if rest.eq_ignore_ascii_case("encoded") => Command::View(DataView::Encoded),
        "view" => Command::View(DataView::Decoded),
        "export" if !rest.is_empty() => Command::Export(PathBuf::from(rest)),
        "import" if !rest.is_empty() => Command::Import(PathBuf::from(rest)),
        "wipe" => Command::Wipe,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(format!("Unknown command {line:?}; type help")),
    };
    Ok(command)
}

fn execute(controller: &mut PlaybackSessionController<RodioEngine>, command: Command) {
    match command {
        Command::Open(path) => match controller.open(&path) {
            Ok(()) => print_status(controller),
            Err(err) => println!("{err}"),
        },
        Command::Play => report(controller.play()),
        Command::Pause => controller.pause(),
        Command::Toggle => report(controller.toggle()),
        Command::Seek(text) => {
            if !controller.seek_to_time_entry(&text) {
                println!("Expected HH:MM:SS");
            }
        }
        Command::Skip(delta) => controller.skip(delta),
        Command::NextChapter => {
            if !controller.next_chapter() {
                println!("No later chapter");
            }
        }
        Command::Chapters => {
            for (index, chapter) in controller.chapters().iter().enumerate() {
                println!("{index:>3}  {}", chapter.label());
            }
        }
        Command::Chapter(index) => {
            if let Err(err) = controller.goto_chapter_at(index) {
                println!("{err}");
            }
        }
        Command::Mark(note) => report(controller.add_bookmark(&note)),
        Command::Marks => {
            for (index, bookmark) in controller.store().bookmarks().iter().enumerate() {
                let name = bookmark
                    .file
                    .file_name()
                    .map(|name| name.to_string_lossy().chars().take(30).collect::<String>())
                    .unwrap_or_default();
                println!(
                    "{index:>3}  {name:<30}  {}  {}",
                    format_hms(bookmark.position_ms),
                    bookmark.note
                );
            }
        }
        Command::Jump(index) => match controller.load_bookmark(index) {
            Ok(advisory) => report(advisory),
            Err(err) => println!("{err}"),
        },
        Command::Back => {
            if !controller.return_to_previous_position() {
                println!("No earlier position to return to");
            }
        }
        Command::Unmark(indices) => {
            let removed = controller.delete_bookmarks(&indices);
            println!("Removed {removed} bookmarks");
        }
        Command::Volume(text) => {
            let change = controller.apply_volume_edit(&text);
            report(change.advisory);
            println!("Volume {} (slider {})", change.applied, change.slider);
        }
        Command::Shelf => {
            for path in controller.shelf_titles() {
                println!("{}", path.display());
            }
        }
        Command::Mode(mode) => {
            controller.set_render_mode(mode);
            println!("Visualizer: {}", mode.label());
        }
        Command::View(view) => match controller.store().view(view) {
            Ok(text) => println!("{text}"),
            Err(err) => println!("{err}"),
        },
        Command::Export(path) => match controller.store().export_to(&path) {
            Ok(()) => println!("Exported to {}", path.display()),
            Err(err) => println!("{err}"),
        },
        Command::Import(path) => match controller.import_data(&path) {
            Ok(()) => println!("Imported {}", path.display()),
            Err(err) => println!("{err}"),
        },
        Command::Wipe => controller.wipe_data(),
        Command::Status => print_status(controller),
        Command::Help => println!("{HELP}"),
        Command::Meter | Command::Quit => {}
    }
}

fn report(advisory: Option<Advisory>) {
    if let Some(advisory) = advisory {
        println!("{advisory}");
    }
}

fn print_status(controller: &PlaybackSessionController<RodioEngine>) {
    let Some(session) = controller.session() else {
        println!("No title loaded");
        return;
    };
    let engine = controller.engine();
    let length = engine
        .length_ms()
        .map(format_hms)
        .unwrap_or_else(|| "--:--:--".into());
    println!(
        "{:?}  {}  {} / {length}  vol {}",
        controller.state(),
        session.file.display(),
        format_hms(engine.position_ms()),
        engine.volume()
    );
    if let Some(title) = session.metadata.tag("TrackTitle") {
        println!("Title: {title}");
    }
    if let Some(label) = controller.continue_from_label() {
        println!("{label}");
    }
}

/// One-line meter of the newest level.
fn draw_meter(controller: &PlaybackSessionController<RodioEngine>) {
    const WIDTH: usize = 40;
    let level = controller
        .render()
        .last()
        .map(|point| match controller.render_mode() {
            RenderMode::Radial => (point[0].hypot(point[1]) - 0.5).clamp(0.0, 1.0),
            RenderMode::Waveform | RenderMode::Bars => point[1],
        })
        .unwrap_or(0.0);
    let filled = ((level * WIDTH as f32).round() as usize).min(WIDTH);
    eprint!("\r[{}{}]", "#".repeat(filled), " ".repeat(WIDTH - filled));
}
