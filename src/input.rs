//! Move entry: SAN first, long algebraic (UCI) as a fallback.

use std::io::{self, BufRead, Write};

use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Move, Position};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoveInputError {
    #[error("invalid move format: {0}")]
    InvalidFormat(String),
    #[error("illegal move: {0}")]
    IllegalMove(String),
}

/// Parses user input as a move in the given position. SAN is tried first,
/// then UCI; a move that parses either way is legal by construction.
pub fn parse_move(pos: &Chess, text: &str) -> Result<Move, MoveInputError> {
    if let Ok(san) = text.parse::<SanPlus>() {
        if let Ok(mv) = san.san.to_move(pos) {
            return Ok(mv);
        }
    }

    if let Ok(uci) = text.parse::<UciMove>() {
        return uci
            .to_move(pos)
            .map_err(|_| MoveInputError::IllegalMove(text.to_string()));
    }

    Err(MoveInputError::InvalidFormat(text.to_string()))
}

/// Prompts until a legal move is entered. Returns `None` when stdin is
/// closed, which ends the game cleanly.
pub fn prompt_move(
    pos: &Chess,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<Option<Move>> {
    loop {
        let side = if pos.turn().is_white() {
            "White"
        } else {
            "Black"
        };
        write!(out, "Enter the next move for {side} (SAN or UCI): ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        match parse_move(pos, text) {
            Ok(mv) => return Ok(Some(mv)),
            Err(MoveInputError::InvalidFormat(_)) => {
                writeln!(out, "Invalid move format. Please try again.\n")?;
            }
            Err(MoveInputError::IllegalMove(_)) => {
                writeln!(out, "Illegal move. Please try again.\n")?;
            }
        }
    }
}
