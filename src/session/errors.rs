use crate::game::Winner;
use crate::ws::ChannelError;

/// Why a local intent was refused. None of these touch the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("not connected to the game server")]
    NotConnected,

    #[error("waiting for the server to start a game")]
    NotSynced,

    #[error("this game is already over ({winner} won)")]
    AlreadyOver { winner: Winner },

    #[error("cell {0} is already chosen")]
    AlreadyChosen(usize),

    #[error("cell {0} is off the board")]
    InvalidCell(usize),

    #[error("gave up reconnecting after {0} attempts")]
    ReconnectExhausted(u32),
}

impl From<ChannelError> for SessionError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::NotConnected
            | ChannelError::Timeout(_)
            | ChannelError::Connect(_)
            | ChannelError::Transport(_) => SessionError::NotConnected,
        }
    }
}

impl SessionError {
    /// Short machine-readable code, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotConnected => "NOT_CONNECTED",
            SessionError::NotSynced => "NOT_SYNCED",
            SessionError::AlreadyOver { .. } => "ALREADY_OVER",
            SessionError::AlreadyChosen(_) => "ALREADY_CHOSEN",
            SessionError::InvalidCell(_) => "INVALID_CELL",
            SessionError::ReconnectExhausted(_) => "RECONNECT_EXHAUSTED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_errors_collapse_to_not_connected() {
        let err: SessionError = ChannelError::NotConnected.into();
        assert_eq!(err, SessionError::NotConnected);
        let err: SessionError = ChannelError::Transport("reset".into()).into();
        assert_eq!(err.code(), "NOT_CONNECTED");
    }

    #[test]
    fn already_over_names_winner() {
        let err = SessionError::AlreadyOver {
            winner: Winner::Computer,
        };
        assert_eq!(err.to_string(), "this game is already over (COMPUTER won)");
        assert_eq!(err.code(), "ALREADY_OVER");
    }
}
