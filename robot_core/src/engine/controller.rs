use crate::engine::adapter::{checked_legal_moves, GameAdapter};
use crate::engine::budget::{CancelToken, SearchBudget};
use crate::engine::config::{EngineChoice, EngineKind, SearchConfig};
use crate::engine::error::SearchError;
use crate::engine::mcts::MonteCarloEngine;
use crate::engine::search::AlphaBetaEngine;
use crate::engine::{SearchOutcome, Searcher};
use std::sync::Arc;

/// Entry point for "pick a move for this position". Chooses the engine,
/// applies the time budget and always hands back a legal move while the
/// game is live.
pub struct SearchController {
    config: Arc<SearchConfig>,
    cancel: CancelToken,
}

impl SearchController {
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            cancel: CancelToken::new(),
        })
    }

    /// Token that stops the running search early. The best move found so far
    /// is still returned.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clear a previous cancel so the next search runs normally.
    pub fn resume(&self) {
        self.cancel.reset();
    }

    #[must_use]
    pub fn engine_for<G: GameAdapter>(&self, position: &G) -> EngineKind {
        match self.config.engine {
            EngineChoice::Auto => position.preferred_engine(),
            EngineChoice::AlphaBeta => EngineKind::AlphaBeta,
            EngineChoice::MonteCarlo => EngineKind::MonteCarlo,
        }
    }

    pub fn search<G: GameAdapter>(
        &self,
        position: &G,
    ) -> Result<SearchOutcome<G::Move>, SearchError> {
        let budget = SearchBudget::new(self.config.time_limit(), self.cancel.clone());
        let engine = self.engine_for(position);

        if position.is_terminal() {
            let pass = position.pass_move().ok_or(SearchError::GameOver)?;
            let mut outcome = SearchOutcome::empty(engine);
            outcome.best_move = Some(pass);
            outcome.fallback = true;
            return Ok(outcome);
        }

        let legal = checked_legal_moves(position)?;
        let root = position.clone();
        let mut outcome = match engine {
            EngineKind::AlphaBeta => {
                AlphaBetaEngine::<G>::new(self.config.clone()).search(&root, &budget)?
            }
            EngineKind::MonteCarlo => {
                MonteCarloEngine::new(self.config.clone()).search(&root, &budget)?
            }
        };

        if outcome.best_move.is_none() {
            log::warn!("{engine:?} search produced no move, falling back to the first legal move");
            outcome.best_move = legal.into_iter().next();
            outcome.fallback = true;
        }

        log::info!(
            "{:?} move {} -> {:?} score {:.3} depth {} nodes {} sims {} in {}ms",
            engine,
            position.move_number(),
            outcome.best_move,
            outcome.score,
            outcome.stats.depth,
            outcome.stats.nodes,
            outcome.stats.simulations,
            outcome.stats.time_ms,
        );
        Ok(outcome)
    }
}
