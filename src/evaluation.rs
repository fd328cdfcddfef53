//! The move-ranking core: play each legal move on a scratch copy of the
//! position, score the result with the tablebase or the engine, and sort.

use std::time::{Duration, Instant};

use shakmaty::fen::Fen;
use shakmaty::{Chess, Color, EnPassantMode, Move, Position};
use tracing::debug;

use crate::engine::{EngineError, RawScore, UciEngine};
use crate::tablebase::SyzygyProber;

/// Centipawn value mate scores are folded in at, so plain integer comparison
/// ranks mates above any material advantage.
pub const MATE_SCORE: i32 = 1_000_000;

/// A position score from White's point of view. `score` is always
/// comparable; `mate` carries the signed mate distance for display
/// (positive means White mates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eval {
    pub score: i32,
    pub mate: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ScoredMove {
    pub mv: Move,
    pub eval: Eval,
}

impl Eval {
    /// Converts an engine score, reported from `turn`'s point of view, to
    /// White's point of view.
    pub fn from_raw(raw: RawScore, turn: Color) -> Eval {
        match raw {
            RawScore::Cp(cp) => Eval {
                score: if turn.is_white() { cp } else { -cp },
                mate: None,
            },
            RawScore::Mate(n) => {
                // n <= 0 means the side to move is the one getting mated
                let pov_score = if n > 0 { MATE_SCORE - n } else { -MATE_SCORE - n };
                let (score, mate) = if turn.is_white() {
                    (pov_score, n)
                } else {
                    (-pov_score, -n)
                };
                Eval {
                    score,
                    mate: Some(mate),
                }
            }
        }
    }
}

/// Evaluates a single move: the tablebase answers when it covers the
/// resulting position, the engine otherwise.
pub fn evaluate_move(
    pos: &Chess,
    engine: &mut UciEngine,
    tablebase: Option<&SyzygyProber>,
    mv: &Move,
    depth: u32,
) -> Result<Eval, EngineError> {
    let mut after = pos.clone();
    after.play_unchecked(mv);

    if let Some(eval) = tablebase.and_then(|tb| tb.probe(&after)) {
        return Ok(eval);
    }

    let fen = Fen::from_position(after.clone(), EnPassantMode::Legal).to_string();
    let raw = engine.evaluate(&fen, depth)?;
    Ok(Eval::from_raw(raw, after.turn()))
}

/// Evaluates every legal move in the position. The progress callback is
/// invoked as `(done, total, elapsed)` after each move so the caller can
/// render a progress bar without this loop knowing about terminals.
pub fn evaluate_all<F>(
    pos: &Chess,
    engine: &mut UciEngine,
    tablebase: Option<&SyzygyProber>,
    depth: u32,
    mut progress: F,
) -> Result<Vec<ScoredMove>, EngineError>
where
    F: FnMut(usize, usize, Duration),
{
    let legal = pos.legal_moves();
    let total = legal.len();
    let start = Instant::now();
    let mut scored = Vec::with_capacity(total);

    for (i, mv) in legal.iter().enumerate() {
        let eval = evaluate_move(pos, engine, tablebase, mv, depth)?;
        debug!(score = eval.score, "evaluated move {}/{total}", i + 1);
        scored.push(ScoredMove {
            mv: mv.clone(),
            eval,
        });
        progress(i + 1, total, start.elapsed());
    }

    Ok(scored)
}

/// Sorts moves best-first for the side to move: descending by score when
/// White is to move, ascending when Black is. The sort is stable, so equal
/// scores keep their generation order.
pub fn sort_moves(moves: &mut [ScoredMove], turn: Color) {
    if turn.is_white() {
        moves.sort_by(|a, b| b.eval.score.cmp(&a.eval.score));
    } else {
        moves.sort_by(|a, b| a.eval.score.cmp(&b.eval.score));
    }
}

/// Evaluation depth by game stage: deep in the endgame where positions are
/// forcing, shallow in a crowded opening where depth buys little.
pub fn dynamic_depth(pos: &Chess) -> u32 {
    let pieces = pos.board().occupied().count() - 2; // kings don't count
    let fullmove = pos.fullmoves().get();

    if pieces <= 6 {
        25
    } else if pieces <= 10 {
        22
    } else if fullmove <= 10 && pieces >= 20 {
        14
    } else if fullmove <= 15 && pieces >= 16 {
        16
    } else {
        20
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::uci::UciMove;
    use shakmaty::CastlingMode;

    fn position(fen: &str) -> Chess {
        fen.parse::<Fen>()
            .unwrap()
            .into_position(CastlingMode::Standard)
            .unwrap()
    }

    fn scored(uci: &str, score: i32) -> ScoredMove {
        let pos = Chess::default();
        let mv = uci.parse::<UciMove>().unwrap().to_move(&pos).unwrap();
        ScoredMove {
            mv,
            eval: Eval { score, mate: None },
        }
    }

    #[test]
    fn centipawns_flip_sign_for_black() {
        let eval = Eval::from_raw(RawScore::Cp(-30), Color::Black);
        assert_eq!(eval.score, 30);
        assert_eq!(eval.mate, None);

        let eval = Eval::from_raw(RawScore::Cp(50), Color::White);
        assert_eq!(eval.score, 50);
    }

    #[test]
    fn mate_scores_convert_to_white_perspective() {
        // Black to move and mated in 3: winning for White
        let eval = Eval::from_raw(RawScore::Mate(-3), Color::Black);
        assert_eq!(eval.score, MATE_SCORE - 3);
        assert_eq!(eval.mate, Some(3));

        // White to move and mating in 2
        let eval = Eval::from_raw(RawScore::Mate(2), Color::White);
        assert_eq!(eval.score, MATE_SCORE - 2);
        assert_eq!(eval.mate, Some(2));

        // White to move and already mated
        let eval = Eval::from_raw(RawScore::Mate(0), Color::White);
        assert_eq!(eval.score, -MATE_SCORE);
    }

    #[test]
    fn closer_mates_score_higher() {
        let near = Eval::from_raw(RawScore::Mate(-1), Color::Black);
        let far = Eval::from_raw(RawScore::Mate(-5), Color::Black);
        assert!(near.score > far.score);
    }

    #[test]
    fn white_sorts_descending() {
        let mut moves = vec![scored("e2e4", 10), scored("d2d4", 80), scored("g1f3", -5)];
        sort_moves(&mut moves, Color::White);

        let scores: Vec<i32> = moves.iter().map(|m| m.eval.score).collect();
        assert_eq!(scores, vec![80, 10, -5]);
    }

    #[test]
    fn black_sorts_ascending() {
        let mut moves = vec![scored("e2e4", 10), scored("d2d4", 80), scored("g1f3", -5)];
        sort_moves(&mut moves, Color::Black);

        let scores: Vec<i32> = moves.iter().map(|m| m.eval.score).collect();
        assert_eq!(scores, vec![-5, 10, 80]);
    }

    #[test]
    fn sorting_equal_scores_is_stable() {
        let mut moves = vec![scored("e2e4", 10), scored("d2d4", 10), scored("g1f3", 10)];
        sort_moves(&mut moves, Color::White);

        let ucis: Vec<String> = moves
            .iter()
            .map(|m| m.mv.to_uci(CastlingMode::Standard).to_string())
            .collect();
        assert_eq!(ucis, vec!["e2e4", "d2d4", "g1f3"]);
    }

    #[test]
    fn mates_outrank_material() {
        let mut moves = vec![
            scored("e2e4", 950),
            ScoredMove {
                mv: scored("d2d4", 0).mv,
                eval: Eval::from_raw(RawScore::Mate(-4), Color::Black),
            },
        ];
        sort_moves(&mut moves, Color::White);
        assert_eq!(moves[0].eval.mate, Some(4));
    }

    #[test]
    fn depth_follows_game_stage() {
        // opening: full board, move 1
        assert_eq!(dynamic_depth(&Chess::default()), 14);

        // sparse endgame probes deep
        let endgame = position("8/8/4k3/8/8/3QK3/8/8 w - - 0 60");
        assert_eq!(dynamic_depth(&endgame), 25);

        // middlegame default
        let middlegame =
            position("r1bq1rk1/pp3ppp/2nbpn2/3p4/3P4/2NBPN2/PP3PPP/R1BQ1RK1 w - - 4 20");
        assert_eq!(dynamic_depth(&middlegame), 20);
    }
}
