//! State reconciliation. Turns peer messages into the client's view of the
//! game, and decides locally whether an intent is worth sending at all.
//!
//! `Synchronizer` does no I/O. [`Session`](super::Session) feeds it channel
//! events and asks it to vet intents, which keeps every rule here testable
//! without a socket.

use tracing::{debug, warn};

use crate::game::{BOARD_SIZE, GameKind, GameState, ProtocolError, Winner};
use crate::ws::{ChannelError, ConnectionStatus, InboundMessage, OutboundIntent, decode};

use super::errors::SessionError;

// ---------------------------------------------------------------------------
// Phase & events
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Never opened.
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Connected, waiting for the peer to send `start` or `reset`.
    Syncing,
    /// A game is in progress.
    Active,
    /// The peer declared a result; choices are frozen.
    GameOver,
    /// The transport is gone.
    Disconnected,
}

/// What presentation code is told. Transport and protocol problems are
/// separate variants from authoritative game events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The channel opened; the session is syncing.
    Connected,
    /// A `start`, `reset` or `playerChoice` replaced the reconciled state.
    StateUpdated(GameState),
    /// The game ended. Emitted once per finished game.
    GameOver { winner: Winner, state: GameState },
    /// The peer refused the last move. Reconciled state is unchanged.
    MoveRejected { message: String },
    /// An inbound frame failed validation and was dropped.
    ProtocolError { error: ProtocolError, raw: String },
    /// The peer closed the connection.
    Disconnected { reason: Option<String> },
    /// The connection failed or dropped.
    TransportError(ChannelError),
}

impl SessionEvent {
    /// True for connection-level events, as opposed to game events.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SessionEvent::Connected
                | SessionEvent::Disconnected { .. }
                | SessionEvent::TransportError(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Owner of the reconciled [`GameState`].
///
/// The board only ever changes through [`Synchronizer::apply`]; sending an
/// intent never alters it.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    state: Option<GameState>,
    phase: SessionPhase,
    /// Local game-over gate. Set by `gameOver`, cleared by a sent reset or a
    /// fresh game from the peer.
    over: Option<Winner>,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self {
            state: None,
            phase: SessionPhase::Idle,
            over: None,
        }
    }

    /// Latest peer-confirmed state, if any message has arrived yet.
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.over.is_some()
    }

    // -----------------------------------------------------------------
    // Transport transitions
    // -----------------------------------------------------------------

    pub fn on_connecting(&mut self) {
        self.phase = SessionPhase::Connecting;
    }

    /// The reconciled state survives a reconnect, but play resumes only
    /// after the peer starts or resets a game.
    pub fn on_opened(&mut self) {
        self.phase = SessionPhase::Syncing;
    }

    pub fn on_disconnected(&mut self) {
        self.phase = SessionPhase::Disconnected;
    }

    // -----------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------

    /// Vet a cell choice against the last known state.
    pub fn prepare_choice(
        &self,
        cell: usize,
        status: ConnectionStatus,
    ) -> Result<OutboundIntent, SessionError> {
        if status != ConnectionStatus::Open {
            return Err(SessionError::NotConnected);
        }
        if cell >= BOARD_SIZE {
            return Err(SessionError::InvalidCell(cell));
        }
        if let Some(winner) = self.over {
            return Err(SessionError::AlreadyOver { winner });
        }
        if self.phase != SessionPhase::Active {
            return Err(SessionError::NotSynced);
        }
        let state = self.state.as_ref().ok_or(SessionError::NotSynced)?;
        if !state.board().is_free(cell) {
            return Err(SessionError::AlreadyChosen(cell));
        }
        Ok(OutboundIntent::choice(cell))
    }

    /// Vet a reset request. Allowed whenever the channel is open.
    pub fn prepare_reset(&self, status: ConnectionStatus) -> Result<OutboundIntent, SessionError> {
        if status != ConnectionStatus::Open {
            return Err(SessionError::NotConnected);
        }
        Ok(OutboundIntent::reset())
    }

    /// A reset went out: lift the game-over gate without waiting for the
    /// peer. The board stays as it is until the peer sends a new one.
    pub fn mark_reset_sent(&mut self) {
        self.over = None;
    }

    // -----------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------

    /// Process one raw frame from the peer.
    pub fn apply(&mut self, raw: &str) -> SessionEvent {
        match decode(raw) {
            Ok(InboundMessage::State(state)) => self.reconcile(state),
            Ok(InboundMessage::Fail { message, board }) => {
                if board.is_some() {
                    debug!("ignoring board on fail message");
                }
                SessionEvent::MoveRejected { message }
            }
            Err(error) => {
                warn!(%error, "dropping invalid peer message");
                SessionEvent::ProtocolError {
                    error,
                    raw: raw.to_owned(),
                }
            }
        }
    }

    fn reconcile(&mut self, state: GameState) -> SessionEvent {
        let kind = state.kind();
        debug!(%kind, filled = state.board().filled(), "reconciling state");

        if kind.starts_game() {
            self.phase = SessionPhase::Active;
            self.over = None;
        }

        let event = match kind {
            GameKind::Start | GameKind::Reset | GameKind::PlayerChoice => {
                SessionEvent::StateUpdated(state.clone())
            }
            GameKind::GameOver => {
                let winner = state.winner().unwrap_or(Winner::Draw);
                // A repeat of the terminal state (e.g. resent after a
                // reconnect) must not count as a second result.
                let repeat = self.phase == SessionPhase::GameOver
                    || self.state.as_ref() == Some(&state);
                self.phase = SessionPhase::GameOver;
                self.over = Some(winner);
                if repeat {
                    SessionEvent::StateUpdated(state.clone())
                } else {
                    SessionEvent::GameOver {
                        winner,
                        state: state.clone(),
                    }
                }
            }
            GameKind::Fail => {
                return SessionEvent::MoveRejected {
                    message: state.message().to_owned(),
                };
            }
        };

        self.state = Some(state);
        event
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
