use std::fmt::Write;

use crate::game::{Board, GameState, Winner};
use crate::session::SessionPhase;

use super::scoreboard::Scoreboard;

/// Draw the board as a 3x3 grid. Empty cells show their index so the user
/// knows what to type.
pub fn render_board(board: &Board) -> String {
    let mut out = String::new();
    for (r, row) in board.rows().enumerate() {
        if r > 0 {
            out.push_str("---+---+---\n");
        }
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(c, cell)| match cell {
                Some(mark) => format!(" {mark} "),
                None => format!("({})", r * 3 + c),
            })
            .collect();
        out.push_str(&cells.join("|"));
        out.push('\n');
    }
    out
}

/// Result banner for a finished game.
pub fn outcome_line(winner: Winner) -> &'static str {
    match winner {
        Winner::Player => "You Won!",
        Winner::Computer => "You Lost!",
        Winner::Draw => "It was a draw",
    }
}

/// Full screen: board (if known), status line, scoreboard.
pub fn render_screen(state: Option<&GameState>, phase: SessionPhase, score: &Scoreboard) -> String {
    let mut out = String::new();
    match state {
        Some(state) => {
            out.push_str(&render_board(state.board()));
            if !state.message().is_empty() {
                let _ = writeln!(out, "{}", state.message());
            }
            if let Some(winner) = state.winner() {
                let _ = writeln!(out, "== {} ==", outcome_line(winner));
            }
        }
        None => out.push_str("(no game yet)\n"),
    }
    let _ = writeln!(out, "phase: {phase:?}");
    let _ = writeln!(
        out,
        "computer {} | player {} | draws {}",
        score.computer_wins, score.player_wins, score.draws
    );
    out
}
