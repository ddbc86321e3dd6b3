//! REPL command parsing.
//!
//! # Responsibility
//! - Turn one input line into a `Command`.
//! - Keep free-text arguments (`title`, `content`) verbatim after the verb.

use notesync_core::{Intent, NoteId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const HELP: &str = "\
commands:
  list                 show notes and the edit session
  load                 refetch all notes from the remote
  select <id>          edit a note
  title <text>         set the draft title
  content <text>       set the draft content
  submit               create (idle) or save (editing)
  cancel               leave editing and clear drafts
  delete <id>          delete a note
  session              show the edit session
  sync                 wait for all in-flight writes
  help                 show this help
  quit                 wait for in-flight writes and exit";

/// One parsed REPL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Load,
    Session,
    Sync,
    Help,
    Quit,
    Intent(Intent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    MissingArgument(&'static str),
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(verb) => write!(f, "unknown command `{verb}`; try `help`"),
            Self::MissingArgument(name) => write!(f, "missing argument <{name}>"),
        }
    }
}

impl Error for CommandError {}

/// Parses one line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let trimmed = line.trim_start();
    if trimmed.trim().is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest),
        None => (trimmed.trim_end(), ""),
    };
    let rest = rest.trim_start().trim_end_matches(['\r', '\n']);

    let command = match verb.to_ascii_lowercase().as_str() {
        "list" | "ls" => Command::List,
        "load" => Command::Load,
        "session" => Command::Session,
        "sync" => Command::Sync,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "select" | "edit" => Command::Intent(Intent::Select(required_id(rest)?)),
        "delete" | "rm" => Command::Intent(Intent::Delete(required_id(rest)?)),
        "title" => Command::Intent(Intent::ChangeTitle(rest.to_string())),
        "content" => Command::Intent(Intent::ChangeContent(rest.to_string())),
        "submit" | "save" => Command::Intent(Intent::Submit),
        "cancel" => Command::Intent(Intent::Cancel),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn required_id(rest: &str) -> Result<NoteId, CommandError> {
    let value = rest.trim();
    if value.is_empty() {
        return Err(CommandError::MissingArgument("id"));
    }
    Ok(NoteId::parse(value))
}
