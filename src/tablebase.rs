//! Syzygy tablebase probing, delegated to `shakmaty-syzygy`. Probe errors
//! are soft: the engine is always there as a fallback.

use std::path::Path;

use shakmaty::{Chess, Color, Position};
use shakmaty_syzygy::{Tablebase, Wdl};
use tracing::warn;

use crate::evaluation::{Eval, MATE_SCORE};

/// DTZ values at or above this are table artifacts, not a usable
/// moves-to-mate hint.
const MAX_REASONABLE_DTZ: i32 = 1000;

pub struct SyzygyProber {
    tables: Tablebase<Chess>,
}

impl SyzygyProber {
    /// Opens the tablebase directory. Returns `None`, with a notice, when
    /// the directory is missing or holds no table files.
    pub fn open(path: &Path) -> Option<SyzygyProber> {
        if !path.is_dir() {
            println!("Syzygy tablebases not found at {}", path.display());
            return None;
        }

        let mut tables = Tablebase::new();
        match tables.add_directory(path) {
            Ok(0) => {
                println!("Syzygy tablebases not found at {}", path.display());
                None
            }
            Ok(_) => Some(SyzygyProber { tables }),
            Err(e) => {
                println!("Error loading Syzygy tablebases: {e}");
                warn!(path = %path.display(), error = %e, "tablebase load failed");
                None
            }
        }
    }

    /// Scores a position exactly when the tables cover it. `None` means the
    /// caller should ask the engine instead.
    pub fn probe(&self, pos: &Chess) -> Option<Eval> {
        if pos.board().occupied().count() > self.tables.max_pieces() {
            return None;
        }

        let wdl = self.tables.probe_wdl_after_zeroing(pos).ok()?;
        if wdl == Wdl::Draw {
            return Some(Eval {
                score: 0,
                mate: None,
            });
        }

        let dtz = self.tables.probe_dtz(pos).ok()?.ignore_rounding().0;
        Some(probe_eval(wdl, dtz, pos.turn()))
    }

    /// One-line WDL/DTZ summary of the position, from the side to move's
    /// point of view, e.g. "Tablebase: Win (DTZ: 12)".
    pub fn report(&self, pos: &Chess) -> Option<String> {
        if pos.board().occupied().count() > self.tables.max_pieces() {
            return None;
        }

        let wdl = self.tables.probe_wdl_after_zeroing(pos).ok()?;
        let result = match wdl {
            Wdl::Draw => "Draw",
            Wdl::Win | Wdl::CursedWin => "Win",
            Wdl::Loss | Wdl::BlessedLoss => "Loss",
        };

        let dtz = self
            .tables
            .probe_dtz(pos)
            .ok()
            .map(|d| d.ignore_rounding().0.abs().to_string())
            .unwrap_or_else(|| "N/A".to_string());

        Some(format!("Tablebase: {result} (DTZ: {dtz})"))
    }
}

/// Maps a decisive WDL/DTZ probe to a White-perspective eval. The DTZ
/// distance doubles as the displayed mate hint when it is plausible.
fn probe_eval(wdl: Wdl, dtz: i32, turn: Color) -> Eval {
    let distance = dtz.abs();
    let winning = matches!(wdl, Wdl::Win | Wdl::CursedWin);

    let pov_score = if winning {
        MATE_SCORE - distance
    } else {
        -(MATE_SCORE - distance)
    };
    let pov_mate = if winning { distance } else { -distance };

    let score = if turn.is_white() { pov_score } else { -pov_score };
    let mate = if distance >= MAX_REASONABLE_DTZ {
        None
    } else {
        Some(if turn.is_white() { pov_mate } else { -pov_mate })
    };

    Eval { score, mate }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_unavailable() {
        assert!(SyzygyProber::open(Path::new("/no/such/syzygy")).is_none());
    }

    #[test]
    fn empty_directory_is_unavailable() {
        let dir = std::env::temp_dir().join(format!("rankfish-empty-tb-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(SyzygyProber::open(&dir).is_none());
        std::fs::remove_dir(&dir).unwrap();
    }

    #[test]
    fn win_for_white_scores_near_mate() {
        let eval = probe_eval(Wdl::Win, 12, Color::White);
        assert_eq!(eval.score, MATE_SCORE - 12);
        assert_eq!(eval.mate, Some(12));
    }

    #[test]
    fn win_for_black_is_negative_for_white() {
        let eval = probe_eval(Wdl::Win, 8, Color::Black);
        assert_eq!(eval.score, -(MATE_SCORE - 8));
        assert_eq!(eval.mate, Some(-8));
    }

    #[test]
    fn loss_for_white_is_negative() {
        let eval = probe_eval(Wdl::Loss, -5, Color::White);
        assert_eq!(eval.score, -(MATE_SCORE - 5));
        assert_eq!(eval.mate, Some(-5));
    }

    #[test]
    fn unreasonable_dtz_drops_the_mate_hint() {
        let eval = probe_eval(Wdl::Win, 4321, Color::White);
        assert!(eval.score > 0);
        assert_eq!(eval.mate, None);
    }
}
