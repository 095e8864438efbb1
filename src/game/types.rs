use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mark
// ---------------------------------------------------------------------------

/// Occupant of a board cell, as reported by the peer (e.g. `"X"`, `"O"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Mark(String);

impl Mark {
    pub fn new(symbol: impl Into<String>) -> Self {
        Mark(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Number of cells on the board.
pub const BOARD_SIZE: usize = 9;

/// A 3x3 board stored row-major: index 0 is top-left, 8 is bottom-right.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Board([Option<Mark>; BOARD_SIZE]);

impl Board {
    /// A board with every cell empty.
    pub fn empty() -> Self {
        Board::default()
    }

    /// Build a board from a peer-supplied cell list. The list must hold
    /// exactly nine entries.
    pub fn from_cells(cells: Vec<Option<Mark>>) -> Result<Self, ProtocolError> {
        let len = cells.len();
        let cells: [Option<Mark>; BOARD_SIZE] = cells
            .try_into()
            .map_err(|_| ProtocolError::BoardLength(len))?;
        Ok(Board(cells))
    }

    /// The occupant of `index`, or `None` when empty or out of range.
    pub fn get(&self, index: usize) -> Option<&Mark> {
        self.0.get(index).and_then(Option::as_ref)
    }

    /// True if `index` is on the board and nobody has claimed it.
    pub fn is_free(&self, index: usize) -> bool {
        index < BOARD_SIZE && self.0[index].is_none()
    }

    pub fn cells(&self) -> &[Option<Mark>; BOARD_SIZE] {
        &self.0
    }

    /// Number of occupied cells.
    pub fn filled(&self) -> usize {
        self.0.iter().filter(|c| c.is_some()).count()
    }

    /// Rows of three, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Mark>]> {
        self.0.chunks(3)
    }
}

// ---------------------------------------------------------------------------
// GameKind
// ---------------------------------------------------------------------------

/// Discriminator of an inbound peer message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameKind {
    Start,
    Reset,
    PlayerChoice,
    GameOver,
    Fail,
}

impl GameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::Start => "start",
            GameKind::Reset => "reset",
            GameKind::PlayerChoice => "playerChoice",
            GameKind::GameOver => "gameOver",
            GameKind::Fail => "fail",
        }
    }

    /// Kinds that begin a fresh game on the peer.
    pub fn starts_game(self) -> bool {
        matches!(self, GameKind::Start | GameKind::Reset)
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Winner
// ---------------------------------------------------------------------------

/// Outcome of a finished game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    Player,
    Computer,
    Draw,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Player => write!(f, "PLAYER"),
            Winner::Computer => write!(f, "COMPUTER"),
            Winner::Draw => write!(f, "DRAW"),
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// A peer-confirmed snapshot of the game.
///
/// `winner` is only ever set when `kind` is [`GameKind::GameOver`]; the
/// constructor enforces this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    kind: GameKind,
    message: String,
    board: Board,
    winner: Option<Winner>,
}

impl GameState {
    /// Validate and build a state. A `gameOver` state requires a winner; a
    /// winner on any other kind is discarded.
    pub fn new(
        kind: GameKind,
        message: impl Into<String>,
        board: Board,
        winner: Option<Winner>,
    ) -> Result<Self, ProtocolError> {
        let winner = match kind {
            GameKind::GameOver => Some(winner.ok_or(ProtocolError::MissingField {
                kind,
                field: "winner",
            })?),
            _ => None,
        };
        Ok(GameState {
            kind,
            message: message.into(),
            board,
            winner,
        })
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.kind == GameKind::GameOver
    }
}

// ---------------------------------------------------------------------------
// ProtocolError
// ---------------------------------------------------------------------------

/// An inbound payload that does not match the peer message schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("board must have 9 cells, got {0}")]
    BoardLength(usize),

    #[error("`{kind}` message is missing field `{field}`")]
    MissingField {
        kind: GameKind,
        field: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Option<Mark> {
        Some(Mark::new("X"))
    }

    #[test]
    fn empty_board_is_all_free() {
        let board = Board::empty();
        assert!((0..BOARD_SIZE).all(|i| board.is_free(i)));
        assert_eq!(board.filled(), 0);
    }

    #[test]
    fn board_rejects_wrong_length() {
        assert_eq!(
            Board::from_cells(vec![None; 8]),
            Err(ProtocolError::BoardLength(8))
        );
        assert_eq!(
            Board::from_cells(vec![None; 10]),
            Err(ProtocolError::BoardLength(10))
        );
    }

    #[test]
    fn board_lookup() {
        let mut cells = vec![None; BOARD_SIZE];
        cells[4] = x();
        let board = Board::from_cells(cells).unwrap();
        assert_eq!(board.get(4).map(Mark::as_str), Some("X"));
        assert!(!board.is_free(4));
        assert!(board.is_free(0));
        assert!(!board.is_free(9));
        assert_eq!(board.get(42), None);
        assert_eq!(board.filled(), 1);
    }

    #[test]
    fn board_rows_are_row_major() {
        let mut cells = vec![None; BOARD_SIZE];
        cells[3] = x();
        let board = Board::from_cells(cells).unwrap();
        let rows: Vec<_> = board.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], x());
    }

    #[test]
    fn game_over_requires_winner() {
        let err = GameState::new(GameKind::GameOver, "", Board::empty(), None).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingField {
                kind: GameKind::GameOver,
                field: "winner"
            }
        );
    }

    #[test]
    fn winner_dropped_unless_game_over() {
        let state =
            GameState::new(GameKind::PlayerChoice, "", Board::empty(), Some(Winner::Player))
                .unwrap();
        assert_eq!(state.winner(), None);

        let state =
            GameState::new(GameKind::GameOver, "", Board::empty(), Some(Winner::Draw)).unwrap();
        assert_eq!(state.winner(), Some(Winner::Draw));
        assert!(state.is_over());
    }

    #[test]
    fn kind_display_matches_wire_names() {
        assert_eq!(GameKind::PlayerChoice.to_string(), "playerChoice");
        assert_eq!(GameKind::GameOver.to_string(), "gameOver");
        assert!(GameKind::Reset.starts_game());
        assert!(!GameKind::Fail.starts_game());
    }

    #[test]
    fn winner_display() {
        assert_eq!(Winner::Computer.to_string(), "COMPUTER");
        assert_eq!(Winner::Player.to_string(), "PLAYER");
    }
}
