//! Monte Carlo tree search with UCT selection.
//!
//! Workers share one arena tree behind a mutex. The lock is only held to
//! pick a child, to insert children and to record results; move generation,
//! make/unmake and playouts run unlocked on each worker's own copy of the
//! position.

pub mod node;
pub mod playout;
pub mod tree;

use crate::engine::adapter::{checked_legal_moves, GameAdapter, Player, SearchLine};
use crate::engine::budget::SearchBudget;
use crate::engine::config::{EngineKind, SearchConfig};
use crate::engine::error::SearchError;
use crate::engine::{RootChild, SearchOutcome, Searcher};
use node::NodeId;
use parking_lot::Mutex;
use playout::{playout, PlayoutSettings};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tree::UctTree;

/// Simulation cap for searches with neither a clock nor an explicit limit.
const DEFAULT_SIMULATION_CAP: u64 = 10_000;
/// A worker that panics this many times in a row gives up.
const MAX_CONSECUTIVE_PANICS: u32 = 16;

struct Shared<M> {
    tree: Mutex<UctTree<M>>,
    stop: AtomicBool,
    simulations: AtomicU64,
    recovered: AtomicU32,
    fault: Mutex<Option<SearchError>>,
    simulation_cap: Option<u64>,
    min_simulations: u64,
}

impl<M> Shared<M> {
    fn should_stop(&self, budget: &SearchBudget) -> bool {
        let simulations = self.simulations.load(Ordering::Relaxed);
        self.stop.load(Ordering::Acquire)
            || budget.is_cancelled()
            || (budget.expired() && simulations >= self.min_simulations)
            || self.simulation_cap.is_some_and(|cap| simulations >= cap)
    }

    fn halt(&self) {
        self.stop.store(true, Ordering::Release);
    }

    fn fail(&self, error: SearchError) {
        let mut fault = self.fault.lock();
        if fault.is_none() {
            *fault = Some(error);
        }
        self.halt();
    }
}

pub struct MonteCarloEngine {
    config: Arc<SearchConfig>,
}

impl MonteCarloEngine {
    #[must_use]
    pub const fn new(config: Arc<SearchConfig>) -> Self {
        Self { config }
    }

    fn worker<G: GameAdapter>(
        &self,
        worker: usize,
        root: &G,
        root_player: Player,
        shared: &Shared<G::Move>,
        budget: &SearchBudget,
    ) {
        let config = &self.config;
        let mut rng = config.seed.map_or_else(StdRng::from_entropy, |seed| {
            StdRng::seed_from_u64(seed.wrapping_add(worker as u64))
        });
        let verify = config.verify_digests && !config.blitz;
        let mut line = SearchLine::new(root.clone(), verify);
        let mut consecutive_panics = 0;

        while !shared.should_stop(budget) {
            let result = catch_unwind(AssertUnwindSafe(|| {
                self.iterate(&mut line, root, root_player, shared, &mut rng)
            }));
            match result {
                Ok(Ok(())) => consecutive_panics = 0,
                Ok(Err(error)) => {
                    log::error!("uct worker {worker}: {error}");
                    shared.fail(error);
                    break;
                }
                Err(_) => {
                    consecutive_panics += 1;
                    shared.recovered.fetch_add(1, Ordering::Relaxed);
                    log::warn!("uct worker {worker} recovered from a panic in the game adapter");
                    // The position may be half-updated; start again from a fresh copy.
                    line = SearchLine::new(root.clone(), verify);
                    if consecutive_panics >= MAX_CONSECUTIVE_PANICS {
                        log::error!("uct worker {worker} retired after {consecutive_panics} panics");
                        break;
                    }
                }
            }
        }
    }

    /// Prior rewards for `moves` from the mover's point of view, one ply
    /// ahead of `line`. Empty when priors are off.
    fn priors<G: GameAdapter>(
        &self,
        line: &mut SearchLine<G>,
        moves: &[G::Move],
    ) -> Result<Vec<f64>, SearchError> {
        if self.config.initial_win_rate_weight == 0 {
            return Ok(Vec::new());
        }
        let mover = line.position().to_move();
        let mut priors = Vec::with_capacity(moves.len());
        for mv in moves {
            line.make(mv);
            let position = line.position();
            let prior = if position.is_terminal() {
                match position.winner() {
                    Some(w) if w == mover => 1.0,
                    Some(_) => -1.0,
                    None => 0.0,
                }
            } else {
                position.normalized_score(mover)
            };
            line.unmake(mv)?;
            priors.push(if prior.is_nan() { 0.0 } else { prior });
        }
        Ok(priors)
    }

    /// One select / expand / simulate / backpropagate round.
    fn iterate<G: GameAdapter>(
        &self,
        base: &mut SearchLine<G>,
        root: &G,
        root_player: Player,
        shared: &Shared<G::Move>,
        rng: &mut StdRng,
    ) -> Result<(), SearchError> {
        let config = &self.config;
        let mut scratch;
        let line = if config.blitz {
            scratch = SearchLine::new(root.clone(), false);
            &mut scratch
        } else {
            base
        };

        // Selection
        let mut node = NodeId::ROOT;
        while !line.position().is_terminal() {
            let next = {
                let tree = shared.tree.lock();
                tree.select_child(
                    node,
                    config.exploration_constant,
                    config.only_child_optimization,
                    config.randomize_uct_children,
                    rng,
                )
                .and_then(|child| {
                    tree.get(child)
                        .and_then(|n| n.mv.clone())
                        .map(|mv| (child, mv))
                })
            };
            let Some((child, mv)) = next else {
                break;
            };
            line.make(&mv);
            node = child;
        }

        // Expansion
        if !line.position().is_terminal() {
            let wants_children = shared.tree.lock().should_expand(
                node,
                config.node_expansion_rate,
                config.uct_tree_depth,
            );
            if wants_children {
                let moves = line.legal_moves()?;
                let priors = self.priors(line, &moves)?;
                let mover = line.position().to_move();
                let (added, size, next) = {
                    let mut tree = shared.tree.lock();
                    let added = if tree.len() < config.child_limit {
                        tree.expand(node, moves, mover)
                    } else {
                        0
                    };
                    if added > 0 {
                        tree.seed_children(node, &priors, config.initial_win_rate_weight);
                    }
                    let next = if added > 0 {
                        tree.select_child(
                            node,
                            config.exploration_constant,
                            false,
                            config.randomize_uct_children,
                            rng,
                        )
                        .and_then(|c| tree.get(c).and_then(|n| n.mv.clone()).map(|mv| (c, mv)))
                    } else {
                        None
                    };
                    (added, tree.len(), next)
                };
                if added > 0 && size >= config.child_limit && config.child_limit_hard_stop {
                    log::debug!("uct tree reached {size} nodes, stopping");
                    shared.halt();
                }
                if let Some((child, mv)) = next {
                    line.make(&mv);
                    node = child;
                }
            }
        }

        let terminal_value = if config.terminal_node_optimization {
            let position = line.position();
            position.is_terminal().then(|| {
                let mover = shared.tree.lock().get(node).and_then(|n| n.mover);
                match (position.winner(), mover) {
                    (Some(w), Some(m)) if w == m => 1.0,
                    (Some(_), _) => -1.0,
                    (None, _) => 0.0,
                }
            })
        } else {
            None
        };

        // Simulation and backpropagation
        let settings = PlayoutSettings {
            final_depth: config.final_depth,
            blitz: config.blitz,
            win_loss_only: config.win_loss_only,
        };
        let leaf_depth = line.depth();
        for _ in 0..config.simulations_per_node {
            let reward = if config.blitz {
                let mut sim = SearchLine::new(line.position().clone(), false);
                playout(&mut sim, root_player, leaf_depth, settings, rng)?
            } else {
                let reward = playout(line, root_player, leaf_depth, settings, rng)?;
                line.unwind_to(leaf_depth)?;
                reward
            };
            shared.simulations.fetch_add(1, Ordering::Relaxed);

            let mut tree = shared.tree.lock();
            tree.backpropagate(node, reward, root_player);
            if let Some(value) = terminal_value {
                if tree.prove(node, value, config.dead_child_optimization) {
                    drop(tree);
                    log::debug!("uct root decided, stopping");
                    shared.halt();
                    break;
                }
            }
            if terminal_value.is_some() {
                // A finished game gives the same result every time.
                break;
            }
        }

        if !config.blitz {
            line.unwind_to(0)?;
        }
        Ok(())
    }
}

impl<G: GameAdapter> Searcher<G> for MonteCarloEngine {
    fn search(
        &mut self,
        position: &G,
        budget: &SearchBudget,
    ) -> Result<SearchOutcome<G::Move>, SearchError> {
        let mut outcome = SearchOutcome::empty(EngineKind::MonteCarlo);
        let moves = checked_legal_moves(position)?;
        let single = self.config.single_choice_optimization && moves.len() == 1;
        if moves.is_empty() || single {
            outcome.best_move = moves.into_iter().next();
            outcome.principal_variation.extend(outcome.best_move.clone());
            return Ok(outcome);
        }
        let min_simulations = self.config.min_simulations;
        if budget.is_cancelled() || (budget.expired() && min_simulations == 0) {
            return Ok(outcome);
        }

        let simulation_cap = self.config.max_simulations.or_else(|| {
            if budget.has_time_limit() {
                None
            } else {
                log::warn!(
                    "uct search has no time or simulation limit, capping at {DEFAULT_SIMULATION_CAP}"
                );
                Some(DEFAULT_SIMULATION_CAP)
            }
        });

        let root_player = position.to_move();
        let priors = self.priors(&mut SearchLine::new(position.clone(), false), &moves)?;
        let mut tree = UctTree::new().with_only_child_optimization(self.config.only_child_optimization);
        tree.expand(NodeId::ROOT, moves, root_player);
        tree.seed_children(NodeId::ROOT, &priors, self.config.initial_win_rate_weight);
        let shared = Shared {
            tree: Mutex::new(tree),
            stop: AtomicBool::new(false),
            simulations: AtomicU64::new(0),
            recovered: AtomicU32::new(0),
            fault: Mutex::new(None),
            simulation_cap,
            min_simulations,
        };

        let threads = self.config.effective_threads();
        if threads <= 1 {
            self.worker(0, position, root_player, &shared, budget);
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("uct-worker-{i}"))
                .build()?;
            let this = &*self;
            let shared = &shared;
            pool.scope(|scope| {
                for worker in 0..threads {
                    scope.spawn(move |_| {
                        this.worker(worker, position, root_player, shared, budget);
                    });
                }
            });
        }

        if let Some(error) = shared.fault.lock().take() {
            return Err(error);
        }

        let tree = shared.tree.into_inner();
        let simulations = shared.simulations.load(Ordering::Relaxed);
        outcome.stats.simulations = simulations;
        outcome.stats.nodes = simulations;
        outcome.stats.stored_nodes = tree.len();
        outcome.stats.depth = tree.max_depth();
        outcome.stats.recovered_faults = shared.recovered.load(Ordering::Relaxed);
        outcome.stats.time_ms = budget.elapsed_ms();

        let decided = tree.root().is_some_and(|r| r.proven.is_some());
        if simulations == 0 && !decided {
            return Ok(outcome);
        }

        let children = tree
            .root()
            .and_then(|r| r.children.clone())
            .unwrap_or_default();
        outcome.root_children = children
            .iter()
            .filter_map(|c| tree.get(*c).map(|n| (tree.visits(*c), n)))
            .filter_map(|(visits, n)| {
                n.mv.clone().map(|mv| RootChild {
                    mv,
                    score: n.proven.unwrap_or_else(|| n.mean()),
                    visits,
                })
            })
            .collect();

        if let Some(best) = tree.best_child(NodeId::ROOT).and_then(|c| tree.get(c)) {
            outcome.best_move = best.mv.clone();
            outcome.score = best.proven.unwrap_or_else(|| best.mean());
        }
        outcome.principal_variation = tree.principal_variation();
        log::debug!(
            "uct: {simulations} simulations, {} nodes, depth {}, score {:.3}",
            outcome.stats.stored_nodes,
            outcome.stats.depth,
            outcome.score
        );
        Ok(outcome)
    }
}
