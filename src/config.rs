use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Locations checked for the engine binary, in order.
const ENGINE_CANDIDATES: &[&str] = &[
    "/opt/homebrew/bin/stockfish",
    "/usr/local/bin/stockfish",
    "/opt/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/usr/games/stockfish",
];

const FALLBACK_ENGINE_PATH: &str = "/usr/games/stockfish";

#[derive(Parser, Debug)]
#[command(
    name = "rankfish",
    version,
    about = "Interactive chess analysis with a UCI engine"
)]
pub struct Cli {
    /// Path to the UCI engine binary
    #[arg(long, value_name = "PATH")]
    pub engine_path: Option<PathBuf>,

    /// Number of threads for the engine to use
    #[arg(long)]
    pub threads: Option<u32>,

    /// Engine hash table size in MB
    #[arg(long)]
    pub hash_size: Option<u32>,

    /// Engine skill level, 0-20 where 20 is strongest
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=20))]
    pub skill_level: Option<u8>,

    /// Evaluation depth in plies
    #[arg(long = "depth", alias = "eval-depth")]
    pub eval_depth: Option<u32>,

    /// Pick the evaluation depth per position based on game stage
    #[arg(long)]
    pub dynamic_depth: bool,

    /// Path to Syzygy tablebase files
    #[arg(long, value_name = "PATH")]
    pub syzygy_path: Option<PathBuf>,

    /// Path to a JSON config file with engine settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Save the resolved settings to a JSON config file and exit
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine_path: PathBuf,
    pub threads: u32,
    pub hash_size: u32,
    pub skill_level: u8,
    pub eval_depth: u32,
    pub dynamic_depth: bool,
    pub syzygy_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine_path: find_engine_binary().1,
            threads: 4,
            hash_size: 16384, // MB
            skill_level: 20,
            eval_depth: 18,
            dynamic_depth: false,
            syzygy_path: PathBuf::from("~/chess/syzygy"),
        }
    }
}

impl Config {
    /// Resolves the final configuration. Precedence, highest first:
    /// command-line arguments, config file settings, defaults.
    pub fn resolve(cli: &Cli) -> Config {
        let mut config = Config::default();

        if let Some(path) = &cli.config {
            match load_config_file(path) {
                Ok(file) => file.apply(&mut config),
                Err(e) => {
                    println!("Error loading config file: {e}");
                    println!("Using default configuration...");
                }
            }
        }

        if let Some(path) = &cli.engine_path {
            config.engine_path = path.clone();
        }
        if let Some(threads) = cli.threads {
            config.threads = threads;
        }
        if let Some(hash_size) = cli.hash_size {
            config.hash_size = hash_size;
        }
        if let Some(skill_level) = cli.skill_level {
            config.skill_level = skill_level;
        }
        if let Some(eval_depth) = cli.eval_depth {
            config.eval_depth = eval_depth;
        }
        if cli.dynamic_depth {
            config.dynamic_depth = true;
        }
        if let Some(path) = &cli.syzygy_path {
            config.syzygy_path = path.clone();
        }

        config.syzygy_path = expand_tilde(&config.syzygy_path);
        config
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },
    #[error("error reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("invalid JSON in config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("error saving config file: {0}")]
    Save(#[from] io::Error),
    #[error("error serializing config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Subset of settings a config file may override. Every field is optional
/// so a file only needs to mention what it changes.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub engine_path: Option<PathBuf>,
    pub threads: Option<u32>,
    pub hash_size: Option<u32>,
    pub skill_level: Option<u8>,
    pub eval_depth: Option<u32>,
    pub dynamic_depth: Option<bool>,
    pub syzygy_path: Option<PathBuf>,
}

const KNOWN_KEYS: &[&str] = &[
    "engine_path",
    "threads",
    "hash_size",
    "skill_level",
    "eval_depth",
    "dynamic_depth",
    "syzygy_path",
];

impl FileConfig {
    fn apply(self, config: &mut Config) {
        if let Some(engine_path) = self.engine_path {
            config.engine_path = engine_path;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(hash_size) = self.hash_size {
            config.hash_size = hash_size;
        }
        if let Some(skill_level) = self.skill_level {
            config.skill_level = skill_level;
        }
        if let Some(eval_depth) = self.eval_depth {
            config.eval_depth = eval_depth;
        }
        if let Some(dynamic_depth) = self.dynamic_depth {
            config.dynamic_depth = dynamic_depth;
        }
        if let Some(syzygy_path) = self.syzygy_path {
            config.syzygy_path = syzygy_path;
        }
    }
}

pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let unknown: Vec<String> = map
        .keys()
        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
        .cloned()
        .collect();

    if !unknown.is_empty() {
        println!(
            "Warning: Unknown config fields will be ignored: {}",
            unknown.join(", ")
        );
        for key in &unknown {
            map.remove(key);
        }
    }

    serde_json::from_value(serde_json::Value::Object(map)).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Finds the engine binary. Returns whether it was actually found and the
/// path to use (a platform default when nothing turned up).
pub fn find_engine_binary() -> (bool, PathBuf) {
    // 'which' first, it knows about PATH customizations
    if let Ok(output) = Command::new("which").arg("stockfish").output() {
        if output.status.success() {
            let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
            if is_executable(&path) {
                debug!(path = %path.display(), "engine binary found via which");
                return (true, path);
            }
        }
    }

    for candidate in ENGINE_CANDIDATES {
        let path = PathBuf::from(candidate);
        if is_executable(&path) {
            return (true, path);
        }
    }

    (false, PathBuf::from(FALLBACK_ENGINE_PATH))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn expand_tilde(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };

    if let Some(rest) = text.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }

    path.to_path_buf()
}
