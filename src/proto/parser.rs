// src/proto/parser.rs
use thiserror::Error;

use super::command::{Action, Command, Param, Scene};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0} (try /help)")]
    UnknownCommand(String),
    #[error("{0} needs a value")]
    MissingValue(&'static str),
    #[error("invalid integer for {0}: {1}")]
    BadInt(&'static str, String),
    #[error("{name} must be in {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("invalid value for {0}: {1}")]
    BadEnum(&'static str, String),
    #[error("unknown scene: {0}")]
    UnknownScene(String),
    #[error("unexpected argument after {0}: {1}")]
    UnexpectedArgument(&'static str, String),
}

/// Public API: serialize a command to a LF-terminated line.
pub fn format_command(cmd: &Command) -> String {
    let mut out = cmd.to_string();
    out.push('\n');
    out
}

/// Public API: parse a typed command from user input.
///
/// Keywords are case-insensitive; raw passthrough is not reachable from
/// here, callers build `Command::Raw` directly.
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let mut tokens = input.split_whitespace();
    let Some(head) = tokens.next() else {
        return Err(ParseError::Empty);
    };
    let head = head.to_ascii_uppercase();

    let cmd = if let Some(param) = Param::ALL.into_iter().find(|p| p.name() == head) {
        let name = param.name();
        let arg = tokens.next().ok_or(ParseError::MissingValue(name))?;
        let value: u32 = arg
            .parse()
            .map_err(|_| ParseError::BadInt(name, arg.to_string()))?;
        let range = param.range();
        if !range.contains(&value) {
            return Err(ParseError::OutOfRange {
                name,
                value,
                min: *range.start(),
                max: *range.end(),
            });
        }
        Command::Set(param, value)
    } else if head == "LOG" {
        let arg = tokens.next().ok_or(ParseError::MissingValue("LOG"))?;
        match arg.to_ascii_uppercase().as_str() {
            "ON" => Command::Action(Action::LogOn),
            "OFF" => Command::Action(Action::LogOff),
            _ => return Err(ParseError::BadEnum("LOG", arg.to_string())),
        }
    } else if head == "SCENE" {
        let arg = tokens.next().ok_or(ParseError::MissingValue("SCENE"))?;
        let scene =
            Scene::from_name(arg).ok_or_else(|| ParseError::UnknownScene(arg.to_string()))?;
        Command::Scene(scene)
    } else if let Some(action) = Action::ALL.into_iter().find(|a| a.name() == head) {
        Command::Action(action)
    } else {
        return Err(ParseError::UnknownCommand(head));
    };

    if let Some(extra) = tokens.next() {
        return Err(ParseError::UnexpectedArgument(keyword(&cmd), extra.to_string()));
    }
    Ok(cmd)
}

fn keyword(cmd: &Command) -> &'static str {
    match cmd {
        Command::Set(param, _) => param.name(),
        Command::Action(action) => action.name(),
        Command::Scene(_) => "SCENE",
        Command::Raw(_) => "raw",
    }
}

/* ------------------------------- tests ------------------------------- */
