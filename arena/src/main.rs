//! Arena - plays two robot configurations against each other.
//!
//! Each move is searched on a background thread through `SearchWorker`
//! while the main loop polls for the answer, the way an interactive client
//! would.

use anyhow::{bail, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use robot_core::engine::{GameAdapter, Player, SearchConfig};
use robot_core::logic::nim::Nim;
use robot_core::logic::tictactoe::TicTacToe;
use robot_core::worker::SearchWorker;
use tracing::{debug, info, warn};

mod config;

use crate::config::{ArenaConfig, Args, GameKind};

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[derive(Debug, Default)]
struct Tally {
    first: usize,
    second: usize,
    draws: usize,
}

/// Play one game. `robots[p]` moves for player `p`.
fn play<G>(
    mut position: G,
    robots: [&SearchConfig; 2],
    arena: &ArenaConfig,
    rng: &mut StdRng,
) -> Result<Option<Player>>
where
    G: GameAdapter + 'static,
{
    for _ in 0..arena.opening_random_moves {
        if position.is_terminal() {
            break;
        }
        if let Some(mv) = position.random_move(rng) {
            debug!(?mv, "random opening move");
            position.make(&mv);
        }
    }

    while !position.is_terminal() {
        let mover = position.to_move();
        let Some(config) = robots.get(mover) else {
            bail!("no robot for player {mover}");
        };
        let mut handle = SearchWorker::spawn((*config).clone(), position.clone())?;
        let outcome = loop {
            if let Some(result) = handle.try_result() {
                break result?;
            }
            std::thread::sleep(arena.poll_interval());
        };

        let Some(mv) = outcome.best_move else {
            bail!("robot for player {mover} returned no move");
        };
        if !position.legal_moves().contains(&mv) {
            bail!("robot for player {mover} played illegal move {mv:?}");
        }
        if outcome.fallback {
            warn!(player = mover, "robot fell back to the first legal move");
        }
        debug!(
            player = mover,
            ?mv,
            score = outcome.score,
            engine = ?outcome.engine,
            nodes = outcome.stats.nodes,
            simulations = outcome.stats.simulations,
            "move"
        );
        position.make(&mv);
    }
    Ok(position.winner())
}

fn run_match(arena: &ArenaConfig) -> Result<Tally> {
    let mut rng = arena
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let mut tally = Tally::default();

    for game in 0..arena.games {
        // Alternate who moves first.
        #[allow(clippy::manual_is_multiple_of)]
        let first_moves_first = game % 2 == 0;
        let robots = if first_moves_first {
            [&arena.first, &arena.second]
        } else {
            [&arena.second, &arena.first]
        };
        let winner = match arena.game {
            GameKind::Nim => play(
                Nim::new(arena.nim_heap, arena.nim_max_take),
                robots,
                arena,
                &mut rng,
            )?,
            GameKind::TicTacToe => play(TicTacToe::new(), robots, arena, &mut rng)?,
        };

        let first_won = winner.map(|w| (w == 0) == first_moves_first);
        match first_won {
            Some(true) => tally.first += 1,
            Some(false) => tally.second += 1,
            None => tally.draws += 1,
        }
        info!(game = game + 1, ?winner, first_moves_first, "game finished");
    }
    Ok(tally)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let arena = ArenaConfig::load(&args)?;
    info!(game = ?arena.game, games = arena.games, "starting arena");

    let tally = run_match(&arena)?;
    info!(
        first = tally.first,
        second = tally.second,
        draws = tally.draws,
        "match finished"
    );
    Ok(())
}
