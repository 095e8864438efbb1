//! Terminal presentation. Consumes session events; never touches the wire.

pub mod notify;
pub mod render;
pub mod scoreboard;

pub use notify::{Notification, Severity};
pub use render::{render_board, render_screen};
pub use scoreboard::Scoreboard;

/// A line of user input, parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Choose(usize),
    Reset,
    Open,
    Close,
    Quit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Ok(cell) = line.parse::<usize>() {
            return Some(Command::Choose(cell));
        }
        match line.to_ascii_lowercase().as_str() {
            "r" | "reset" => Some(Command::Reset),
            "o" | "open" => Some(Command::Open),
            "c" | "close" => Some(Command::Close),
            "q" | "quit" | "exit" => Some(Command::Quit),
            "h" | "help" | "?" => Some(Command::Help),
            _ => None,
        }
    }
}

pub const HELP: &str = "commands: 0-8 choose a cell, r reset, c close, o open, q quit";
