//! Parsing of REPL input lines.

use std::path::PathBuf;

use lingo_tutor::{Day, Language, Level, Mode, PracticeKind};

/// Help text printed by `/help`.
pub const HELP: &str = "\
Commands:
  /help                          Show this help
  /stats                         Show session statistics
  /feedback                      Show feedback from the last turn
  /goals                         Show learning goals
  /week                          Show the weekly practice plan
  /toggle <day> <n> on|off       Check or uncheck task n (1-based) of a day
  /practice grammar|vocabulary|speaking
                                 Start a quick practice
  /language <name>               Switch language (restarts the conversation)
  /level <A1..C2>                Switch level (restarts the conversation)
  /mode [casual|structured]      Toggle or set the conversation mode
  /export <path>                 Write the weekly plan as an .ics calendar
  /quit                          Leave
Anything else is sent to the tutor.";

/// A slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Stats,
    Feedback,
    Goals,
    Week,
    Toggle {
        day: Day,
        /// Zero-based task index.
        index: usize,
        completed: bool,
    },
    Practice(PracticeKind),
    Language(Language),
    Level(Level),
    /// `None` toggles.
    Mode(Option<Mode>),
    Export(PathBuf),
    Quit,
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line.
    Empty,
    /// Text for the tutor.
    Utterance(String),
    /// A slash command.
    Command(Command),
}

/// Parses a line typed at the prompt.
///
/// Errors are user-facing messages.
pub fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Input::Utterance(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    let command = match (name.as_str(), args.as_slice()) {
        ("help" | "h" | "?", []) => Command::Help,
        ("stats", []) => Command::Stats,
        ("feedback", []) => Command::Feedback,
        ("goals", []) => Command::Goals,
        ("week", []) => Command::Week,
        ("toggle", [day, n, state]) => parse_toggle(day, n, state)?,
        ("practice", [kind]) => Command::Practice(kind.parse()?),
        ("language" | "lang", [language]) => Command::Language(language.parse()?),
        ("level", [level]) => Command::Level(level.parse()?),
        ("mode", []) => Command::Mode(None),
        ("mode", [mode]) => Command::Mode(Some(mode.parse()?)),
        ("export", [path]) => Command::Export(PathBuf::from(*path)),
        ("quit" | "exit" | "q", []) => Command::Quit,
        _ => return Err(format!("unknown command '/{rest}', type /help for the list")),
    };
    Ok(Input::Command(command))
}

fn parse_toggle(day: &str, n: &str, state: &str) -> Result<Command, String> {
    let day: Day = day.parse()?;
    let index = n
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| format!("invalid task number '{n}': expected 1 or more"))?;
    let completed = match state.to_lowercase().as_str() {
        "on" | "done" | "yes" => true,
        "off" | "undo" | "no" => false,
        _ => return Err(format!("invalid state '{state}': expected 'on' or 'off'")),
    };
    Ok(Command::Toggle {
        day,
        index,
        completed,
    })
}
