//! Line-oriented terminal shell
//!
//! Games are numbered from 1 on screen; launch requests reach the
//! coordinator as zero-based indices.

use playtime_config::GameDescriptor;
use playtime_core::{CoordinatorState, CoordinatorStatus, CoreEvent};
use playtime_util::format_duration;
use thiserror::Error;

pub const HELP: &str = "commands: list | launch <n> | <n> | status | quit";

/// A parsed input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    /// Zero-based game index
    Launch(usize),
    Status,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("not a game number: {0}")]
    InvalidGameNumber(String),

    #[error("launch needs a game number")]
    MissingGameNumber,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, ShellError> {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(ShellCommand::Empty);
        };

        match first.to_ascii_lowercase().as_str() {
            "list" | "ls" => Ok(ShellCommand::List),
            "status" => Ok(ShellCommand::Status),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
            "launch" | "play" => {
                let number = words.next().ok_or(ShellError::MissingGameNumber)?;
                parse_game_number(number).map(ShellCommand::Launch)
            }
            other if other.chars().all(|c| c.is_ascii_digit()) => {
                parse_game_number(other).map(ShellCommand::Launch)
            }
            other => Err(ShellError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_game_number(s: &str) -> Result<usize, ShellError> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(ShellError::InvalidGameNumber(s.to_string())),
    }
}

pub fn render_games(games: &[GameDescriptor]) -> String {
    if games.is_empty() {
        return "no games configured".to_string();
    }

    games
        .iter()
        .enumerate()
        .map(|(i, game)| format!("{:>3}  {}", i + 1, game.name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_status(status: &CoordinatorStatus) -> String {
    let budget = format!(
        "used {} of {}, {} left",
        format_duration(status.accumulated),
        format_duration(status.daily_limit),
        format_duration(status.remaining)
    );

    match &status.state {
        CoordinatorState::Idle => format!("idle; {}", budget),
        CoordinatorState::Active { game, .. } => format!("playing {}; {}", game, budget),
    }
}

/// Human-readable line for a core event
pub fn render_event(event: &CoreEvent) -> Option<String> {
    match event {
        CoreEvent::SessionStarted { game, .. } => Some(format!("started {}", game)),
        CoreEvent::SessionEnded { game, result } => Some(format!(
            "{} closed after {}",
            game,
            format_duration(result.charged)
        )),
        CoreEvent::BudgetExceeded { .. } | CoreEvent::ProcessFailed { .. } => {
            event.user_message()
        }
    }
}
