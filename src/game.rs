//! The interactive loop: render, rank every legal move, prompt, apply.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::time::Instant;

use anyhow::Result;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Chess, EnPassantMode, Move, Position};
use tracing::info;

use crate::config::Config;
use crate::display;
use crate::engine::UciEngine;
use crate::evaluation::{self, ScoredMove};
use crate::input;
use crate::tablebase::SyzygyProber;

/// Current position plus the played history. The position library keeps no
/// history of its own, so repetition is tracked here with Zobrist hashes.
pub struct Game {
    pub pos: Chess,
    pub history: Vec<Move>,
    repetitions: HashMap<Zobrist64, u32>,
    threefold: bool,
}

impl Game {
    pub fn new() -> Game {
        Game::from_position(Chess::default())
    }

    pub fn from_position(pos: Chess) -> Game {
        let mut game = Game {
            pos,
            history: Vec::new(),
            repetitions: HashMap::new(),
            threefold: false,
        };
        game.record_position();
        game
    }

    /// Applies a move known to be legal in the current position.
    pub fn push(&mut self, mv: Move) {
        self.pos.play_unchecked(&mv);
        self.history.push(mv);
        self.record_position();
    }

    pub fn threefold(&self) -> bool {
        self.threefold
    }

    pub fn fifty_moves(&self) -> bool {
        self.pos.halfmoves() >= 100
    }

    pub fn is_over(&self) -> bool {
        self.pos.is_game_over() || self.fifty_moves() || self.threefold
    }

    fn record_position(&mut self) {
        let hash: Zobrist64 = self.pos.zobrist_hash(EnPassantMode::Legal);
        let count = self.repetitions.entry(hash).or_insert(0);
        *count += 1;
        if *count >= 3 {
            self.threefold = true;
        }
    }
}

impl Default for Game {
    fn default() -> Game {
        Game::new()
    }
}

/// Runs the interactive game on stdin/stdout until the game ends or the
/// player closes the input.
pub fn play(
    game: &mut Game,
    engine: &mut UciEngine,
    tablebase: Option<&SyzygyProber>,
    config: &Config,
) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    play_with_io(game, engine, tablebase, config, &mut input, &mut out)
}

pub fn play_with_io(
    game: &mut Game,
    engine: &mut UciEngine,
    tablebase: Option<&SyzygyProber>,
    config: &Config,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    while !game.is_over() {
        display::print_board(out, &game.pos)?;
        evaluate_and_show(out, game, engine, tablebase, config)?;

        match input::prompt_move(&game.pos, input, out)? {
            Some(mv) => game.push(mv),
            None => {
                info!("input closed, ending game");
                break;
            }
        }
    }

    Ok(())
}

/// Evaluates all legal moves, prints them best-first with a progress bar
/// while the engine works, and reports the time spent.
pub fn evaluate_and_show(
    out: &mut impl Write,
    game: &Game,
    engine: &mut UciEngine,
    tablebase: Option<&SyzygyProber>,
    config: &Config,
) -> Result<Vec<ScoredMove>> {
    let start = Instant::now();

    if let Some(tb) = tablebase {
        if let Some(report) = tb.report(&game.pos) {
            writeln!(out, "{report}")?;
        }
    }

    let depth = if config.dynamic_depth {
        evaluation::dynamic_depth(&game.pos)
    } else {
        config.eval_depth
    };

    let bar_length = display::bar_length();
    let mut scored = evaluation::evaluate_all(
        &game.pos,
        engine,
        tablebase,
        depth,
        |done, total, elapsed| {
            let _ = display::print_progress(&mut *out, done, total, elapsed, bar_length);
        },
    )?;
    display::clear_progress(out)?;

    evaluation::sort_moves(&mut scored, game.pos.turn());
    display::print_possible_moves(out, &scored)?;

    if let Some(best) = scored.first() {
        display::show_mate_info(out, best, game.pos.turn())?;
    }

    writeln!(out, "\nEvaluation time: {:.2} sec\n", start.elapsed().as_secs_f64())?;

    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::fen::Fen;
    use shakmaty::uci::UciMove;
    use shakmaty::CastlingMode;

    fn push_uci(game: &mut Game, uci: &str) {
        let mv = uci
            .parse::<UciMove>()
            .unwrap()
            .to_move(&game.pos)
            .unwrap();
        game.push(mv);
    }

    #[test]
    fn fresh_game_is_not_over() {
        let game = Game::new();
        assert!(!game.is_over());
        assert!(game.history.is_empty());
    }

    #[test]
    fn fools_mate_ends_the_game() {
        let mut game = Game::new();
        for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            push_uci(&mut game, uci);
        }

        assert!(game.pos.is_checkmate());
        assert!(game.is_over());
        assert_eq!(game.history.len(), 4);
    }

    #[test]
    fn knight_shuffle_is_threefold() {
        let mut game = Game::new();
        let shuffle = [
            "g1f3", "g8f6", "f3g1", "f6g8", // back to the start, twice seen
            "g1f3", "g8f6", "f3g1", "f6g8", // thrice
        ];
        for uci in shuffle {
            push_uci(&mut game, uci);
        }

        assert!(game.threefold());
        assert!(game.is_over());
    }

    #[test]
    fn halfmove_clock_triggers_fifty_move_rule() {
        let pos: Chess = "8/8/4k3/8/8/3QK3/8/8 w - - 100 80"
            .parse::<Fen>()
            .unwrap()
            .into_position(CastlingMode::Standard)
            .unwrap();
        let game = Game::from_position(pos);

        assert!(game.fifty_moves());
        assert!(game.is_over());
    }

    #[test]
    fn history_keeps_move_order() {
        let mut game = Game::new();
        push_uci(&mut game, "e2e4");
        push_uci(&mut game, "e7e5");

        let ucis: Vec<String> = game
            .history
            .iter()
            .map(|mv| mv.to_uci(CastlingMode::Standard).to_string())
            .collect();
        assert_eq!(ucis, vec!["e2e4", "e7e5"]);
    }
}
