//! Wire message types exchanged with the game peer.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::{Board, GameKind, GameState, Mark, ProtocolError, Winner};

// ---------------------------------------------------------------------------
// Client → Peer intents
// ---------------------------------------------------------------------------

/// Intent discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Choice,
    Reset,
}

/// A single user action encoded for the peer. Sent once, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundIntent {
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    /// Cell index for `choice`, `null` for `reset`.
    pub payload: Option<usize>,
}

impl OutboundIntent {
    pub fn choice(cell: usize) -> Self {
        OutboundIntent {
            intent_type: IntentType::Choice,
            payload: Some(cell),
        }
    }

    pub fn reset() -> Self {
        OutboundIntent {
            intent_type: IntentType::Reset,
            payload: None,
        }
    }

    /// Serialize to JSON text for sending over WebSocket.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"reset","payload":null}"#.to_string())
    }
}

// ---------------------------------------------------------------------------
// Peer → Client messages
// ---------------------------------------------------------------------------

/// A validated inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// `start`, `reset`, `playerChoice` or `gameOver`: a full state snapshot.
    State(GameState),
    /// `fail`: the peer rejected a move. Any board it carries is advisory.
    Fail {
        message: String,
        board: Option<Board>,
    },
}

/// Loose shape of a peer frame, before per-kind validation.
#[derive(Debug, Deserialize)]
struct RawInbound {
    #[serde(rename = "kind", alias = "type")]
    kind: GameKind,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    board: Option<Vec<Option<RawCell>>>,
    #[serde(default)]
    winner: Option<Winner>,
}

/// Peers have been seen sending markers both as strings and as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCell {
    Text(String),
    Number(i64),
}

impl RawCell {
    fn into_mark(self) -> Option<Mark> {
        match self {
            RawCell::Text(s) if s.is_empty() => None,
            RawCell::Text(s) => Some(Mark::new(s)),
            RawCell::Number(n) => Some(Mark::new(n.to_string())),
        }
    }
}

fn to_board(cells: Vec<Option<RawCell>>) -> Result<Board, ProtocolError> {
    Board::from_cells(
        cells
            .into_iter()
            .map(|c| c.and_then(RawCell::into_mark))
            .collect(),
    )
}

/// Parse and validate one text frame from the peer.
pub fn decode(text: &str) -> Result<InboundMessage, ProtocolError> {
    let raw: RawInbound =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let message = raw.message.unwrap_or_default();

    match raw.kind {
        GameKind::Fail => {
            // The rejection stands even if the board riding along is bad.
            let board = raw.board.and_then(|cells| {
                to_board(cells)
                    .inspect_err(|error| debug!(%error, "ignoring invalid board on fail"))
                    .ok()
            });
            Ok(InboundMessage::Fail { message, board })
        }
        kind @ (GameKind::Start | GameKind::Reset | GameKind::PlayerChoice | GameKind::GameOver) => {
            let cells = raw.board.ok_or(ProtocolError::MissingField {
                kind,
                field: "board",
            })?;
            let board = to_board(cells)?;
            Ok(InboundMessage::State(GameState::new(
                kind, message, board, raw.winner,
            )?))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_intent_serializes() {
        let json = OutboundIntent::choice(4).to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "choice");
        assert_eq!(parsed["payload"], 4);
    }

    #[test]
    fn reset_intent_serializes_null_payload() {
        let json = OutboundIntent::reset().to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "reset");
        assert!(parsed["payload"].is_null());
        assert!(parsed.as_object().unwrap().contains_key("payload"));
    }

    #[test]
    fn start_decodes_empty_board() {
        let msg = decode(r#"{"kind":"start","message":"go","board":[null,null,null,null,null,null,null,null,null]}"#)
            .unwrap();
        let InboundMessage::State(state) = msg else {
            panic!("expected state, got {msg:?}");
        };
        assert_eq!(state.kind(), GameKind::Start);
        assert_eq!(state.message(), "go");
        assert_eq!(state.board(), &Board::empty());
        assert_eq!(state.winner(), None);
    }

    #[test]
    fn type_field_is_accepted_as_discriminator() {
        let msg = decode(
            r#"{"type":"playerChoice","message":"","board":[null,null,null,null,"X",null,null,null,"O"]}"#,
        )
        .unwrap();
        let InboundMessage::State(state) = msg else {
            panic!("expected state");
        };
        assert_eq!(state.kind(), GameKind::PlayerChoice);
        assert_eq!(state.board().get(4).map(Mark::as_str), Some("X"));
        assert_eq!(state.board().get(8).map(Mark::as_str), Some("O"));
    }

    #[test]
    fn numeric_markers_become_text() {
        let msg = decode(r#"{"kind":"reset","board":[1,null,null,null,null,null,null,null,2]}"#)
            .unwrap();
        let InboundMessage::State(state) = msg else {
            panic!("expected state");
        };
        assert_eq!(state.board().get(0).map(Mark::as_str), Some("1"));
        assert_eq!(state.message(), "");
    }

    #[test]
    fn game_over_carries_winner() {
        let msg = decode(
            r#"{"kind":"gameOver","message":"done","board":["X","X","X","O","O",null,null,null,null],"winner":"PLAYER"}"#,
        )
        .unwrap();
        let InboundMessage::State(state) = msg else {
            panic!("expected state");
        };
        assert!(state.is_over());
        assert_eq!(state.winner(), Some(Winner::Player));
    }

    #[test]
    fn game_over_without_winner_is_rejected() {
        let err = decode(r#"{"kind":"gameOver","board":[null,null,null,null,null,null,null,null,null]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MissingField { field: "winner", .. }
        ));
    }

    #[test]
    fn fail_without_board_decodes() {
        let msg = decode(r#"{"kind":"fail","message":"taken"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Fail {
                message: "taken".into(),
                board: None
            }
        );
    }

    #[test]
    fn fail_with_bad_board_still_decodes() {
        let msg = decode(r#"{"kind":"fail","message":"taken","board":[null,"X"]}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Fail {
                message: "taken".into(),
                board: None
            }
        );
    }

    #[test]
    fn state_without_board_is_rejected() {
        let err = decode(r#"{"kind":"playerChoice","message":"x"}"#).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MissingField {
                kind: GameKind::PlayerChoice,
                field: "board"
            }
        ));
    }

    #[test]
    fn short_board_is_rejected() {
        let err = decode(r#"{"kind":"start","board":[null,null,null]}"#).unwrap_err();
        assert_eq!(err, ProtocolError::BoardLength(3));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            decode(r#"{"kind":"victoryDance"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode(r#"{"kind":"gameOver","board":[null,null,null,null,null,null,null,null,null],"winner":"ALIENS"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
