//! Interactive chess analysis around an external UCI engine.
//!
//! The board, move legality, and notation come from `shakmaty`; search comes
//! from the engine process; Syzygy endgame answers come from
//! `shakmaty-syzygy`. What lives here is the orchestration: enumerate the
//! legal moves, score the position after each one, sort, render, repeat.

pub mod config;
pub mod display;
pub mod engine;
pub mod evaluation;
pub mod game;
pub mod input;
pub mod tablebase;

#[cfg(test)]
mod tests {
    use crate::evaluation::{sort_moves, Eval, ScoredMove};
    use crate::game::Game;
    use crate::input::parse_move;
    use shakmaty::{CastlingMode, Color, Position};

    #[test]
    fn a_played_game_ranks_and_ends() {
        // play the fool's mate through the same parsing the prompt uses
        let mut game = Game::new();
        for entry in ["f3", "e5", "g4", "Qh4#"] {
            let mv = parse_move(&game.pos, entry).unwrap();
            game.push(mv);
        }

        assert!(game.pos.is_checkmate());
        assert!(game.is_over());

        let ucis: Vec<String> = game
            .history
            .iter()
            .map(|mv| mv.to_uci(CastlingMode::Standard).to_string())
            .collect();
        assert_eq!(ucis, vec!["f2f3", "e7e5", "g2g4", "d8h4"]);
    }

    #[test]
    fn ranking_puts_the_best_move_first_for_either_side() {
        let game = Game::new();
        let mut moves: Vec<ScoredMove> = game
            .pos
            .legal_moves()
            .iter()
            .enumerate()
            .map(|(i, mv)| ScoredMove {
                mv: mv.clone(),
                eval: Eval {
                    score: i as i32 * 7 - 50,
                    mate: None,
                },
            })
            .collect();

        sort_moves(&mut moves, Color::White);
        assert!(moves.windows(2).all(|w| w[0].eval.score >= w[1].eval.score));

        sort_moves(&mut moves, Color::Black);
        assert!(moves.windows(2).all(|w| w[0].eval.score <= w[1].eval.score));
    }
}
