use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rankfish::config::{Cli, Config};
use rankfish::display;
use rankfish::engine::UciEngine;
use rankfish::game::{self, Game};
use rankfish::tablebase::SyzygyProber;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(&cli);

    if let Some(path) = &cli.save_config {
        config.save(path)?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut engine = UciEngine::open(&config.engine_path)?;
    engine.configure(config.threads, config.hash_size, config.skill_level)?;
    engine.new_game()?;
    info!(path = %config.engine_path.display(), "engine started");

    let tablebase = SyzygyProber::open(&config.syzygy_path);
    if tablebase.is_some() {
        println!("Syzygy tablebases loaded");
    } else {
        println!("Syzygy tablebases not available");
    }

    let mut game = Game::new();
    let played = game::play(&mut game, &mut engine, tablebase.as_ref(), &config);

    if played.is_ok() {
        let mut out = io::stdout();
        display::print_game_over_info(&mut out, &game)?;

        if let Some(tb) = &tablebase {
            if let Some(report) = tb.report(&game.pos) {
                println!("{report}");
            }
        }
    }

    engine.quit()?;
    played
}
