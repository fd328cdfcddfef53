//! Thin client for a UCI engine running as a child process. The engine does
//! all the chess work; this module only writes commands and reads lines.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine at {path}: {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("engine i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine closed its output unexpectedly")]
    UnexpectedEof,
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// Score as reported by the engine, from the side-to-move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawScore {
    /// Centipawns.
    Cp(i32),
    /// Moves until mate. Positive means the side to move mates, zero or
    /// negative means it gets mated.
    Mate(i32),
}

#[derive(Debug)]
pub struct UciEngine {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl UciEngine {
    pub fn open(path: &Path) -> Result<UciEngine, EngineError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("no stdin handle".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("no stdout handle".to_string()))?;

        let mut engine = UciEngine {
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
        };

        engine.send("uci")?;
        engine.wait_for("uciok")?;
        debug!(path = %path.display(), "engine handshake complete");

        Ok(engine)
    }

    pub fn configure(
        &mut self,
        threads: u32,
        hash_mb: u32,
        skill_level: u8,
    ) -> Result<(), EngineError> {
        self.send(&format!("setoption name Threads value {threads}"))?;
        self.send(&format!("setoption name Hash value {hash_mb}"))?;
        self.send(&format!("setoption name Skill Level value {skill_level}"))?;
        self.send("isready")?;
        self.wait_for("readyok")
    }

    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.send("ucinewgame")?;
        self.send("isready")?;
        self.wait_for("readyok")
    }

    /// Scores the position reached in `fen` with a fixed-depth search. The
    /// score of the last `info` line before `bestmove` is the engine's final
    /// word on the position.
    pub fn evaluate(&mut self, fen: &str, depth: u32) -> Result<RawScore, EngineError> {
        self.send(&format!("position fen {fen}"))?;
        self.send(&format!("go depth {depth}"))?;

        let mut last_score = None;

        loop {
            let line = self.read_line()?;
            let line = line.trim();
            trace!(line, "engine");

            if line.starts_with("info") {
                if let Some(score) = parse_info_score(line) {
                    last_score = Some(score);
                }
            } else if line.starts_with("bestmove") {
                return last_score.ok_or_else(|| {
                    EngineError::Protocol(format!("no score reported before '{line}'"))
                });
            }
        }
    }

    pub fn quit(&mut self) -> Result<(), EngineError> {
        self.send("quit")?;
        self.child.wait()?;
        Ok(())
    }

    fn send(&mut self, command: &str) -> Result<(), EngineError> {
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(EngineError::UnexpectedEof);
        }
        Ok(line)
    }

    fn wait_for(&mut self, token: &str) -> Result<(), EngineError> {
        loop {
            if self.read_line()?.trim() == token {
                return Ok(());
            }
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send("quit");
        let _ = self.child.wait();
    }
}

/// Extracts the `score cp N` / `score mate N` pair from a UCI `info` line.
fn parse_info_score(line: &str) -> Option<RawScore> {
    let mut tokens = line.split_whitespace();

    while let Some(token) = tokens.next() {
        if token == "score" {
            let kind = tokens.next()?;
            let value: i32 = tokens.next()?.parse().ok()?;

            return match kind {
                "cp" => Some(RawScore::Cp(value)),
                "mate" => Some(RawScore::Mate(value)),
                _ => None,
            };
        }
    }

    None
}
