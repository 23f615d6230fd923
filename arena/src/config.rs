//! Match settings for the arena.
//!
//! Loaded from a JSON file; CLI flags override individual fields.

use anyhow::{bail, Context, Result};
use clap::Parser;
use robot_core::engine::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "arena", about = "Play game robots against each other")]
pub struct Args {
    /// JSON match settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the number of games
    #[arg(long)]
    pub games: Option<usize>,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Nim,
    TicTacToe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub game: GameKind,
    pub games: usize,
    pub nim_heap: u32,
    pub nim_max_take: u32,
    /// Random moves played before the robots take over, for variety.
    pub opening_random_moves: usize,
    pub seed: Option<u64>,
    pub poll_interval_ms: u64,
    pub first: SearchConfig,
    pub second: SearchConfig,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        let quick = SearchConfig {
            time_per_move_ms: Some(200),
            ..SearchConfig::default()
        };
        Self {
            game: GameKind::TicTacToe,
            games: 10,
            nim_heap: 21,
            nim_max_take: 3,
            opening_random_moves: 1,
            seed: None,
            poll_interval_ms: 10,
            first: quick.clone(),
            second: quick,
        }
    }
}

impl ArenaConfig {
    pub fn load(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => Self::default(),
        };
        if let Some(games) = args.games {
            config.games = games;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.games == 0 {
            bail!("games must be at least 1");
        }
        if self.game == GameKind::Nim && self.nim_heap == 0 {
            bail!("nim_heap must be at least 1");
        }
        self.first.validate().context("first robot")?;
        self.second.validate().context("second robot")?;
        Ok(())
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
