//! anytime - desktop macro CLI
//!
//! Build a macro of clicks and key chords, then replay it now or at a
//! time of day.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{bounded, select, unbounded, Receiver};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use anytime::prelude::*;
use anytime::{Error, SystemClock};

#[derive(Parser)]
#[command(name = "anytime")]
#[command(about = "anytime - record clicks and key chords, replay them now or at a set time")]
#[command(version)]
struct Cli {
    /// Macro file; bare names live in the storage directory
    #[arg(short, long, global = true, default_value = "macro.json")]
    file: PathBuf,

    /// Storage directory (default ~/.anytime)
    #[arg(long, global = true, env = "ANYTIME_DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Delay after the action
#[derive(Args, Clone, Copy)]
struct DelayArgs {
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u64).range(0..=23))]
    hours: u64,
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u64).range(0..=59))]
    minutes: u64,
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(0..=59))]
    seconds: u64,
}

impl DelayArgs {
    fn delay(&self) -> Delay {
        Delay::from_hms(self.hours, self.minutes, self.seconds)
    }
}

#[derive(Subcommand)]
enum Commands {
    // === Editing ===
    /// Add a click at X Y, or at the pointer position after a countdown
    #[command(allow_negative_numbers = true)]
    AddMouse {
        #[arg(requires = "y")]
        x: Option<i32>,
        y: Option<i32>,
        /// Seconds to wait before capturing the pointer
        #[arg(long, default_value = "3")]
        countdown: u64,
        #[command(flatten)]
        delay: DelayArgs,
    },
    /// Add a key chord such as "Ctrl+Shift+S"
    AddKeys {
        chord: String,
        #[command(flatten)]
        delay: DelayArgs,
    },
    /// List actions in playback order
    List,
    /// Print the macro file contents
    Show,
    /// Delete the action at INDEX (0-based)
    Delete { index: usize },
    /// Move the action at FROM to position TO
    Move { from: usize, to: usize },
    /// List saved macro files
    Files,

    // === Playback ===
    /// Play the macro now (Ctrl+C stops)
    Play {
        /// Playback speed (1.0 = as recorded, 2.0 = delays halved)
        #[arg(short, long, default_value = "1.0")]
        speed: f64,
    },
    /// Play the macro at a time of day, e.g. 14:30 or "2:30:00 PM"
    Schedule {
        time: String,
        #[arg(short, long, default_value = "1.0")]
        speed: f64,
    },
    /// Show the live pointer position (Ctrl+C exits)
    Position {
        #[arg(long, default_value = "100")]
        interval_ms: u64,
    },
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
    fn err(e: Error) -> Output<()> {
        Output { success: false, data: None, error: Some(e) }
    }
}

#[derive(Serialize)]
struct ListEntry {
    index: usize,
    label: String,
}

fn print_json<T: Serialize>(output: &T) {
    match serde_json::to_string_pretty(output) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Error: {}", e),
    }
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match storage(cli.dir.as_deref()) {
        Ok(storage) => run(&storage, &cli.file, cli.command),
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn storage(dir: Option<&Path>) -> anytime::Result<MacroStorage> {
    match dir {
        Some(d) => MacroStorage::with_dir(d),
        None => MacroStorage::new(),
    }
}

fn run(storage: &MacroStorage, file: &Path, command: Commands) -> Result<()> {
    match command {
        Commands::AddMouse { x, y, countdown, delay } => add_mouse(storage, file, x.zip(y), countdown, delay.delay()),
        Commands::AddKeys { chord, delay } => add_keys(storage, file, &chord, delay.delay()),
        Commands::List => reported(|| list(storage, file)),
        Commands::Show => reported(|| show(storage, file)),
        Commands::Delete { index } => delete(storage, file, index),
        Commands::Move { from, to } => move_action(storage, file, from, to),
        Commands::Files => reported(|| files(storage)),
        Commands::Play { speed } => play(storage, file, speed),
        Commands::Schedule { time, speed } => schedule(storage, file, &time, speed),
        Commands::Position { interval_ms } => position(interval_ms),
    }
}

/// Print structured failures as a JSON envelope before bubbling them up
fn reported<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    match f() {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(err) = e.downcast_ref::<Error>() {
                print_json(&Output::<()>::err(err.clone()));
            }
            Err(e)
        }
    }
}

/// Ctrl+C as a channel so it can sit in a select! with notifications
fn interrupts() -> Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })?;
    Ok(rx)
}

// ══════════════════════════════════════════════════════════════════════════════
//  Editing commands
// ══════════════════════════════════════════════════════════════════════════════

fn add_mouse(storage: &MacroStorage, file: &Path, at: Option<(i32, i32)>, countdown: u64, delay: Delay) -> Result<()> {
    let action = match at {
        Some((x, y)) => Action::mouse_click(x, y, delay),
        None => {
            for left in (1..=countdown).rev() {
                print!("\rMove the pointer into place... {} ", left);
                io::stdout().flush()?;
                std::thread::sleep(Duration::from_secs(1));
            }
            if countdown > 0 {
                println!();
            }
            Action::capture_mouse(&Desktop::new(), delay)?
        }
    };
    append(storage, file, action)
}

fn add_keys(storage: &MacroStorage, file: &Path, chord: &str, delay: Delay) -> Result<()> {
    let action = Action::capture_keys(chord, delay)?;
    append(storage, file, action)
}

fn append(storage: &MacroStorage, file: &Path, action: Action) -> Result<()> {
    let mut list = storage.load_or_default(file)?;
    println!("Added: {}", action);
    list.append(action);
    storage.save(&list, file)?;
    Ok(())
}

fn list(storage: &MacroStorage, file: &Path) -> Result<()> {
    let list = storage.load(file)?;
    let entries: Vec<ListEntry> = list
        .renderings()
        .into_iter()
        .enumerate()
        .map(|(index, label)| ListEntry { index, label })
        .collect();
    print_json(&Output::ok(entries));
    Ok(())
}

fn show(storage: &MacroStorage, file: &Path) -> Result<()> {
    let list = storage.load(file)?;
    print_json(&Output::ok(list));
    Ok(())
}

fn delete(storage: &MacroStorage, file: &Path, index: usize) -> Result<()> {
    let mut list = storage.load(file)?;
    let removed = list.remove_at(index)?;
    storage.save(&list, file)?;
    println!("Deleted: {}", removed);
    Ok(())
}

fn move_action(storage: &MacroStorage, file: &Path, from: usize, to: usize) -> Result<()> {
    let mut list = storage.load(file)?;
    list.move_item(from, to)?;
    storage.save(&list, file)?;
    for (i, label) in list.renderings().iter().enumerate() {
        println!("{:>3}  {}", i, label);
    }
    Ok(())
}

fn files(storage: &MacroStorage) -> Result<()> {
    let files = storage.list()?;
    print_json(&Output::ok(serde_json::json!({
        "dir": storage.path(),
        "files": files,
    })));
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
//  Playback commands
// ══════════════════════════════════════════════════════════════════════════════

fn engine(speed: f64) -> (Arc<PlaybackEngine>, Receiver<Notification>) {
    let (tx, rx) = unbounded();
    let engine = PlaybackEngine::new(Arc::new(Desktop::new()))
        .speed(speed)
        .notify(tx);
    (Arc::new(engine), rx)
}

fn play(storage: &MacroStorage, file: &Path, speed: f64) -> Result<()> {
    let list = storage.load(file)?;
    let (engine, rx) = engine(speed);
    let quit = interrupts()?;

    println!("Playing {} actions at {}x speed (Ctrl+C to stop)", list.len(), speed);
    engine.start(list.snapshot())?;
    follow(&engine, &rx, &quit, None)
}

fn schedule(storage: &MacroStorage, file: &Path, time: &str, speed: f64) -> Result<()> {
    let at = parse_time_of_day(time)?;
    let list = storage.load(file)?;
    if list.is_empty() {
        return Err(Error::empty_macro().into());
    }

    let (engine, rx) = engine(speed);
    let (tx, status_rx) = unbounded();
    let scheduler = Scheduler::new(Arc::new(SystemClock)).notify(tx);
    let quit = interrupts()?;

    let fire_engine = Arc::clone(&engine);
    let snapshot = list.snapshot();
    let wait = scheduler.schedule(at, move || {
        if let Err(e) = fire_engine.start(snapshot) {
            warn!(error = %e, "scheduled playback did not start");
        }
    })?;

    for n in status_rx.try_iter() {
        print_notification(&n);
    }
    println!("Starts in {}s (Ctrl+C to cancel)", wait.as_secs());
    follow(&engine, &rx, &quit, Some(&scheduler))
}

/// Print notifications until the run finishes or Ctrl+C ends the wait
fn follow(
    engine: &PlaybackEngine,
    rx: &Receiver<Notification>,
    quit: &Receiver<()>,
    scheduler: Option<&Scheduler>,
) -> Result<()> {
    loop {
        select! {
            recv(rx) -> n => match n {
                Ok(Notification::Finished(outcome)) => return finish(outcome),
                Ok(n) => print_notification(&n),
                Err(_) => return Ok(()),
            },
            recv(quit) -> _ => {
                if engine.stop() == StopOutcome::NothingRunning {
                    if let Some(s) = scheduler {
                        if s.cancel() {
                            println!("Schedule cancelled");
                        }
                    } else {
                        println!("No macro is running");
                    }
                    return Ok(());
                }
            },
        }
    }
}

fn finish(outcome: RunOutcome) -> Result<()> {
    match outcome {
        RunOutcome::Completed => {
            println!("Done");
            Ok(())
        }
        RunOutcome::Stopped => {
            println!("Stopped");
            Ok(())
        }
        RunOutcome::Failed(e) => Err(e.into()),
    }
}

fn print_notification(n: &Notification) {
    match n {
        Notification::Status(status) => println!("Status: {}", status),
        Notification::Dispatched { index, action } => println!("[{}] {}", index + 1, action),
        Notification::Position(p) => println!("Pointer: ({}, {})", p.x, p.y),
        Notification::Finished(_) => {}
    }
}

fn position(interval_ms: u64) -> Result<()> {
    let reporter = PositionReporter::with_config(ReporterConfig {
        interval: Duration::from_millis(interval_ms.max(1)),
        ..Default::default()
    });
    let stream = reporter.stream(Arc::new(Desktop::new()))?;
    let quit = interrupts()?;

    loop {
        select! {
            recv(stream.receiver()) -> n => match n {
                Ok(Notification::Position(p)) => {
                    print!("\rPointer: ({}, {})      ", p.x, p.y);
                    io::stdout().flush()?;
                }
                Ok(_) => {}
                Err(_) => break,
            },
            recv(quit) -> _ => break,
        }
    }
    println!();
    stream.stop();
    Ok(())
}
