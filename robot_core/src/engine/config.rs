use crate::engine::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_THREADS: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineChoice {
    /// Let the game decide for the current phase.
    #[default]
    Auto,
    AlphaBeta,
    MonteCarlo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    AlphaBeta,
    MonteCarlo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: EngineChoice,
    /// `None` searches without a clock; alpha-beta then runs one fixed depth.
    pub time_per_move_ms: Option<u64>,

    // Alpha-beta
    pub max_depth: usize,
    /// Number of opening moves on which a random near-best move is played.
    pub randomization_window: usize,
    /// Largest score gap from the best move still eligible on move 1.
    pub randomization_margin: f64,
    /// Plies shaved off the search while randomizing, since pruning is off.
    pub randomization_depth_reduction: usize,
    pub killer_moves: bool,
    /// Order moves by a one-ply static evaluation before searching them.
    pub static_sort: bool,
    /// Stop deepening once the best root score exceeds this.
    pub good_enough_score: Option<f64>,
    pub verify_digests: bool,
    /// Play a lone legal move without searching it.
    pub single_choice_optimization: bool,

    // UCT
    pub exploration_constant: f64,
    pub node_expansion_rate: f64,
    /// Tree levels that are always expanded on first visit.
    pub uct_tree_depth: usize,
    pub child_limit: usize,
    pub child_limit_hard_stop: bool,
    pub simulations_per_node: u32,
    pub max_simulations: Option<u64>,
    /// Simulations run even after the clock has expired.
    pub min_simulations: u64,
    /// Virtual visits seeded into a new node from the static evaluation.
    pub initial_win_rate_weight: u32,
    /// Depth at which a playout is cut off and scored heuristically.
    pub final_depth: usize,
    pub blitz: bool,
    pub win_loss_only: bool,
    pub max_threads: usize,
    pub terminal_node_optimization: bool,
    pub dead_child_optimization: bool,
    pub only_child_optimization: bool,
    pub randomize_uct_children: bool,

    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: EngineChoice::Auto,
            time_per_move_ms: Some(5_000),

            max_depth: 6,
            randomization_window: 0,
            randomization_margin: 0.0,
            randomization_depth_reduction: 1,
            killer_moves: true,
            static_sort: false,
            good_enough_score: None,
            verify_digests: cfg!(debug_assertions),
            single_choice_optimization: true,

            exploration_constant: 0.5,
            node_expansion_rate: 1.0,
            uct_tree_depth: 2,
            child_limit: 100_000,
            child_limit_hard_stop: false,
            simulations_per_node: 1,
            max_simulations: None,
            min_simulations: 0,
            initial_win_rate_weight: 0,
            final_depth: 200,
            blitz: false,
            win_loss_only: false,
            max_threads: 1,
            terminal_node_optimization: true,
            dead_child_optimization: true,
            only_child_optimization: true,
            randomize_uct_children: true,

            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn load_from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        if self.max_depth == 0 {
            return invalid("max_depth", "must be at least 1");
        }
        if !self.randomization_margin.is_finite() || self.randomization_margin < 0.0 {
            return invalid("randomization_margin", "must be a finite value >= 0");
        }
        if self.good_enough_score.is_some_and(f64::is_nan) {
            return invalid("good_enough_score", "must be a number");
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return invalid("exploration_constant", "must be a finite value >= 0");
        }
        if !self.node_expansion_rate.is_finite() || self.node_expansion_rate < 0.0 {
            return invalid("node_expansion_rate", "must be a finite value >= 0");
        }
        if self.child_limit == 0 {
            return invalid("child_limit", "must be at least 1");
        }
        if self.simulations_per_node == 0 {
            return invalid("simulations_per_node", "must be at least 1");
        }
        if self.final_depth == 0 {
            return invalid("final_depth", "must be at least 1");
        }
        if self.max_threads == 0 {
            return invalid("max_threads", "must be at least 1");
        }
        Ok(())
    }

    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_per_move_ms.map(Duration::from_millis)
    }

    /// Requested workers, capped by what the machine reports.
    #[must_use]
    pub fn effective_threads(&self) -> usize {
        let available = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        self.max_threads.min(available).clamp(1, MAX_THREADS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_default() {
        let config = SearchConfig::load_from_json("{}").unwrap();
        assert_eq!(config.engine, EngineChoice::Auto);
        assert_eq!(config.time_per_move_ms, Some(5_000));
        assert_eq!(config.child_limit, 100_000);
        assert!((config.exploration_constant - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_config_partial() {
        let json = r#"{
            "engine": "monte_carlo",
            "time_per_move_ms": null,
            "max_simulations": 500,
            "blitz": true
        }"#;
        let config = SearchConfig::load_from_json(json).unwrap();
        assert_eq!(config.engine, EngineChoice::MonteCarlo);
        assert_eq!(config.time_limit(), None);
        assert_eq!(config.max_simulations, Some(500));
        assert!(config.blitz);
        assert_eq!(config.max_depth, 6);
    }

    #[test]
    fn test_load_config_invalid_json() {
        let result = SearchConfig::load_from_json("{ invalid json }");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_rejects_bad_values() {
        let result = SearchConfig::load_from_json(r#"{ "max_depth": 0 }"#);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "max_depth",
                ..
            })
        ));
        let result = SearchConfig::load_from_json(r#"{ "randomization_margin": -1.0 }"#);
        assert!(result.is_err());
        let result = SearchConfig::load_from_json(r#"{ "good_enough_score": 50.0 }"#);
        assert_eq!(result.unwrap().good_enough_score, Some(50.0));
    }

    #[test]
    fn effective_threads_is_at_least_one() {
        let config = SearchConfig {
            max_threads: 1_000,
            ..SearchConfig::default()
        };
        let threads = config.effective_threads();
        assert!((1..=MAX_THREADS).contains(&threads));
    }
}
