//! User-facing notifications derived from session events and local
//! rejections.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::game::Winner;
use crate::session::{SessionError, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// One toast-style message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    fn new(severity: Severity, text: impl Into<String>) -> Self {
        Notification {
            severity,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Severity::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    /// Shown as soon as a reset has been sent.
    pub fn reset_sent() -> Self {
        Self::success("The game was reset successfully!")
    }

    /// Notification for a session event, if it warrants one.
    pub fn for_event(event: &SessionEvent) -> Option<Self> {
        match event {
            SessionEvent::GameOver { winner, .. } => Some(match winner {
                Winner::Player => Self::success("You won!"),
                Winner::Computer => Self::success("Computer won! Better luck next time."),
                Winner::Draw => Self::success("It was a draw!"),
            }),
            SessionEvent::MoveRejected { .. } => {
                Some(Self::error("This cell has already been chosen."))
            }
            SessionEvent::Connected => Some(Self::success("Connected to the game server.")),
            SessionEvent::Disconnected { reason } => Some(Self::error(match reason {
                Some(reason) => format!("Connection closed: {reason}"),
                None => "Connection closed.".to_string(),
            })),
            SessionEvent::TransportError(error) => {
                Some(Self::error(format!("Connection problem: {error}")))
            }
            SessionEvent::StateUpdated(_) | SessionEvent::ProtocolError { .. } => None,
        }
    }

    /// Notification for an intent refused before it reached the wire.
    pub fn for_rejection(error: &SessionError) -> Self {
        match error {
            SessionError::AlreadyOver { winner } => {
                Self::error(format!("This game is already over. {winner} won!"))
            }
            SessionError::AlreadyChosen(_) => Self::error("This cell is already chosen!"),
            SessionError::NotConnected => Self::error("Not connected to the game server."),
            SessionError::NotSynced => Self::error("Waiting for the server to start a game."),
            SessionError::InvalidCell(cell) => {
                Self::error(format!("There is no cell {cell}; pick 0-8."))
            }
            SessionError::ReconnectExhausted(attempts) => Self::error(format!(
                "Could not reconnect after {attempts} attempts."
            )),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Success => "ok",
            Severity::Error => "!!",
        };
        write!(f, "[{} {tag}] {}", self.timestamp.format("%H:%M:%S"), self.text)
    }
}
