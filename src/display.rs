//! Terminal rendering. Everything writes to a sink so tests can look at
//! the output.

use std::io::{self, Write};
use std::time::Duration;

use shakmaty::{CastlingMode, Chess, Color, File, Move, Outcome, Piece, Position, Rank, Role,
    Square};

use crate::evaluation::ScoredMove;
use crate::game::Game;

const MOVES_PER_LINE: usize = 5;
const DEFAULT_TERMINAL_WIDTH: usize = 80;

/// Clears the terminal and draws the board with borders, White at the
/// bottom.
pub fn print_board(out: &mut impl Write, pos: &Chess) -> io::Result<()> {
    write!(out, "\x1bc")?; // reset-terminal escape, same as clearing

    let border = "  -----------------";
    for rank in (0..8u32).rev() {
        writeln!(out, "{border}")?;
        write!(out, "{} ", rank + 1)?;
        for file in 0..8u32 {
            let square = Square::from_coords(File::new(file), Rank::new(rank));
            let glyph = pos.board().piece_at(square).map_or(' ', piece_glyph);
            write!(out, "|{glyph}")?;
        }
        writeln!(out, "|")?;
    }
    writeln!(out, "{border}")?;
    writeln!(out, "   a b c d e f g h")?;
    writeln!(out)
}

fn piece_glyph(piece: Piece) -> char {
    match (piece.color, piece.role) {
        (Color::White, Role::King) => '♔',
        (Color::White, Role::Queen) => '♕',
        (Color::White, Role::Rook) => '♖',
        (Color::White, Role::Bishop) => '♗',
        (Color::White, Role::Knight) => '♘',
        (Color::White, Role::Pawn) => '♙',
        (Color::Black, Role::King) => '♚',
        (Color::Black, Role::Queen) => '♛',
        (Color::Black, Role::Rook) => '♜',
        (Color::Black, Role::Bishop) => '♝',
        (Color::Black, Role::Knight) => '♞',
        (Color::Black, Role::Pawn) => '♟',
    }
}

pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|cols| cols.parse().ok())
        .unwrap_or(DEFAULT_TERMINAL_WIDTH)
}

/// Bar length that leaves room for the surrounding text.
pub fn bar_length() -> usize {
    terminal_width().saturating_sub(40).max(10)
}

/// `\r`-anchored progress bar with a remaining-time estimate from the
/// running average per move.
pub fn print_progress(
    out: &mut impl Write,
    done: usize,
    total: usize,
    elapsed: Duration,
    bar_length: usize,
) -> io::Result<()> {
    let ratio = done as f64 / total.max(1) as f64;
    let avg_secs = elapsed.as_secs_f64() / done.max(1) as f64;
    let remaining = (avg_secs * (total - done) as f64) as u64;
    let (mins, secs) = (remaining / 60, remaining % 60);

    let filled = ((ratio * bar_length as f64).round() as usize).min(bar_length);
    let bar: String = "#".repeat(filled) + &"-".repeat(bar_length - filled);

    write!(
        out,
        "\rEvaluating: [{bar}] {:.1}% | Remaining: {mins:02}:{secs:02}",
        ratio * 100.0
    )?;
    out.flush()
}

pub fn clear_progress(out: &mut impl Write) -> io::Result<()> {
    write!(out, "\r{}\r", " ".repeat(terminal_width()))?;
    out.flush()
}

/// Lists the moves best-first with their scores and mate distances.
pub fn print_possible_moves(out: &mut impl Write, sorted: &[ScoredMove]) -> io::Result<()> {
    writeln!(out, "Possible moves:")?;

    for scored in sorted {
        let uci = scored.mv.to_uci(CastlingMode::Standard).to_string();
        let mate_text = scored
            .eval
            .mate
            .map(|mate| format!(", Mate in {}", mate.abs()))
            .unwrap_or_default();
        writeln!(
            out,
            "{uci:<5}-> Eval score: {}{mate_text}",
            scored.eval.score
        )?;
    }

    Ok(())
}

/// Announces a forced mate when the best move mates for the side to move.
pub fn show_mate_info(out: &mut impl Write, best: &ScoredMove, turn: Color) -> io::Result<()> {
    if let Some(mate) = best.eval.mate {
        if (mate > 0) == turn.is_white() {
            writeln!(out, "\nMate in {}", mate.abs())?;
        }
    }
    Ok(())
}

pub fn print_move_history(out: &mut impl Write, moves: &[Move]) -> io::Result<()> {
    writeln!(out, "Moves played:")?;

    for (idx, mv) in moves.iter().enumerate() {
        let number = idx + 1;
        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        if number % MOVES_PER_LINE == 0 {
            writeln!(out, "{number:2}. {uci}")?;
        } else {
            write!(out, "{number:2}. {uci}  ")?;
        }
    }

    if moves.len() % MOVES_PER_LINE != 0 {
        writeln!(out)?;
    }

    writeln!(out)
}

pub fn print_game_result(out: &mut impl Write, game: &Game) -> io::Result<()> {
    let pos = &game.pos;

    if pos.is_checkmate() {
        let winner = if pos.turn().is_white() { "Black" } else { "White" };
        writeln!(out, "Checkmate! Winner: {winner}")
    } else if pos.is_stalemate() {
        writeln!(out, "Stalemate! The game is a draw.")
    } else if pos.is_insufficient_material() {
        writeln!(out, "Insufficient material! The game is a draw.")
    } else if game.fifty_moves() {
        writeln!(out, "Fifty-move rule! The game is a draw.")
    } else if game.threefold() {
        writeln!(out, "Threefold repetition! The game is a draw.")
    } else {
        let result = match pos.outcome() {
            Some(Outcome::Decisive {
                winner: Color::White,
            }) => "1-0",
            Some(Outcome::Decisive {
                winner: Color::Black,
            }) => "0-1",
            Some(Outcome::Draw) => "1/2-1/2",
            None => "*",
        };
        writeln!(out, "Game result: {result}")
    }
}

pub fn print_game_over_info(out: &mut impl Write, game: &Game) -> io::Result<()> {
    print_board(out, &game.pos)?;
    writeln!(out, "Game Over!")?;
    print_move_history(out, &game.history)?;
    print_game_result(out, game)
}
