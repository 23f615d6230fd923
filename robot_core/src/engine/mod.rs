use serde::{Deserialize, Serialize};

pub mod adapter;
pub mod budget;
pub mod config;
pub mod controller;
pub mod error;
pub mod eval;
pub mod mcts;
pub mod ordering;
pub mod search;
pub mod zobrist;

#[cfg(test)]
mod win_test;

pub use adapter::{GameAdapter, Player, SearchLine};
pub use budget::{CancelToken, SearchBudget};
pub use config::{EngineChoice, EngineKind, SearchConfig};
pub use controller::SearchController;
pub use error::{ConfigError, SearchError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Deepest completed iteration (alpha-beta) or deepest tree node (UCT).
    pub depth: usize,
    pub nodes: u64,
    pub time_ms: u64,
    pub simulations: u64,
    pub stored_nodes: usize,
    pub killer_cutoffs: u64,
    /// Searches cut short because a good enough score was found.
    pub good_enough_cutoffs: u64,
    pub recovered_faults: u32,
}

/// One root move with the engine's view of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RootChild<M> {
    pub mv: M,
    /// Minimax score (alpha-beta; an upper bound for pruned moves) or mean
    /// reward in [-1, 1] (UCT).
    pub score: f64,
    pub visits: u32,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome<M> {
    pub best_move: Option<M>,
    pub score: f64,
    pub engine: EngineKind,
    pub stats: SearchStats,
    pub principal_variation: Vec<M>,
    pub root_children: Vec<RootChild<M>>,
    /// True when the move came from the controller's fallback rather than a search.
    pub fallback: bool,
}

impl<M> SearchOutcome<M> {
    #[must_use]
    pub fn empty(engine: EngineKind) -> Self {
        Self {
            best_move: None,
            score: 0.0,
            engine,
            stats: SearchStats::default(),
            principal_variation: Vec::new(),
            root_children: Vec::new(),
            fallback: false,
        }
    }
}

pub trait Searcher<G: GameAdapter> {
    fn search(
        &mut self,
        position: &G,
        budget: &SearchBudget,
    ) -> Result<SearchOutcome<G::Move>, SearchError>;
}
