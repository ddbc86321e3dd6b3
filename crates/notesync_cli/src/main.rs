//! Terminal front end for the note sync core.
//!
//! # Responsibility
//! - Resolve configuration from file, environment and flags.
//! - Drive `NoteController` from line commands and print its snapshots.
//! - Report remote write outcomes as they land.

mod command;

use clap::Parser;
use command::{parse_command, Command, HELP};
use log::info;
use notesync_core::{
    core_version, init_logging, HttpNoteClient, NoteController, SyncConfig, WriteOutcome,
};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

/// Optimistic note editing against a remote notes endpoint.
#[derive(Debug, Parser)]
#[command(name = "notesync", version, about)]
struct Args {
    /// Remote notes collection URL.
    #[arg(long)]
    endpoint: Option<String>,
    /// JSON config file; flags and NOTESYNC_* variables override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Per-request timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files (stderr when unset).
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("notesync: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&args)?;
    init_logging(&config.log_level, config.log_dir.as_deref())?;
    info!(
        "event=cli_start module=cli status=ok version={} endpoint={}",
        core_version(),
        config.endpoint
    );

    let client = HttpNoteClient::from_config(&config)?;
    let mut controller = NoteController::new(Arc::new(client));
    println!("notesync {} -> {}", core_version(), config.endpoint);

    if let Err(err) = controller.load().await {
        println!("! {err}");
    }
    print_notes(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(&controller)?;
    loop {
        match next_event(&mut controller, &mut lines).await? {
            Event::Outcome(outcome) => {
                println!();
                print_outcome(&outcome);
                print_notes(&controller);
            }
            Event::Line(None) => break,
            Event::Line(Some(line)) => match parse_command(&line) {
                Ok(Some(command)) => {
                    if !execute(&mut controller, command).await {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => println!("! {err}"),
            },
        }
        prompt(&controller)?;
    }

    for outcome in controller.settle_all().await {
        print_outcome(&outcome);
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<SyncConfig, Box<dyn Error>> {
    let base = match &args.config {
        Some(path) => SyncConfig::from_json_file(path)?,
        None => SyncConfig::default(),
    };
    let mut config = base.overlay_env(|key| std::env::var(key).ok())?;

    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = Some(dir.clone());
    }
    Ok(config.validate()?)
}

/// Next thing the loop reacts to.
enum Event {
    /// A remote write finished and was applied.
    Outcome(WriteOutcome),
    /// A line of input; `None` at end of input.
    Line(Option<String>),
}

/// Waits for whichever comes first: a finished write or an input line.
async fn next_event<R>(
    controller: &mut NoteController,
    lines: &mut Lines<R>,
) -> std::io::Result<Event>
where
    R: AsyncBufRead + Unpin,
{
    let writes_pending = controller.pending_writes() > 0;
    tokio::select! {
        Some(outcome) = controller.next_outcome(), if writes_pending => Ok(Event::Outcome(outcome)),
        line = lines.next_line() => line.map(Event::Line),
    }
}

/// Runs one command. Returns `false` when the loop should stop.
async fn execute(controller: &mut NoteController, command: Command) -> bool {
    match command {
        Command::List => print_notes(controller),
        Command::Load => match controller.load().await {
            Ok(count) => println!("loaded {count} note(s)"),
            Err(err) => println!("! {err}"),
        },
        Command::Session => print_session(controller),
        Command::Sync => {
            for outcome in controller.settle_all().await {
                print_outcome(&outcome);
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Intent(intent) => match controller.dispatch(intent) {
            Ok(Some(ticket)) => {
                println!("sent {ticket}");
                print_notes(controller);
            }
            Ok(None) => {}
            Err(err) => println!("! {err}"),
        },
    }
    true
}

fn prompt(controller: &NoteController) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    match controller.session().selected() {
        Some(id) => write!(stdout, "edit {id}> ")?,
        None => write!(stdout, "new> ")?,
    }
    stdout.flush()
}

fn print_notes(controller: &NoteController) {
    let notes = controller.notes();
    if notes.is_empty() {
        println!("(no notes)");
        return;
    }
    for note in notes.iter() {
        println!("[{}] {}", note.id, note.title);
        for line in note.content.lines() {
            println!("    {line}");
        }
    }
}

fn print_session(controller: &NoteController) {
    let session = controller.session();
    match session.selected() {
        Some(id) => println!("editing {id}"),
        None => println!("idle"),
    }
    println!("  title:   {}", session.title());
    println!("  content: {}", session.content());
}

fn print_outcome(outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Created { ticket, note } => {
            println!("{ticket} created [{}] {}", note.id, note.title)
        }
        WriteOutcome::CreateFailed { ticket, error, .. } => {
            println!("! {ticket} create failed: {error}")
        }
        WriteOutcome::Confirmed { ticket, kind, id } => println!("{ticket} {kind} {id} saved"),
        WriteOutcome::Reverted {
            ticket,
            kind,
            id,
            error,
        } => println!("! {ticket} {kind} {id} reverted: {error}"),
        WriteOutcome::Superseded {
            ticket,
            kind,
            id,
            error,
        } => println!("! {ticket} {kind} {id} failed, newer edit kept: {error}"),
    }
}
