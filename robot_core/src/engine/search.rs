use crate::engine::adapter::{GameAdapter, Player, SearchLine};
use crate::engine::budget::SearchBudget;
use crate::engine::config::{EngineKind, SearchConfig};
use crate::engine::error::SearchError;
use crate::engine::eval::{self, is_loss_score, is_win_score};
use crate::engine::ordering::{shuffle_root, KillerTable, RandomizationWindow};
use crate::engine::zobrist::DigestHistory;
use crate::engine::{RootChild, SearchOutcome, Searcher};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Fraction of the time budget after which no new iteration is started.
const SOFT_LIMIT: f64 = 0.6;

/// A root move tagged with its index in the adapter's move list.
type RankedMove<M> = (usize, M);

struct RootPass<M> {
    scored: Vec<(M, f64)>,
    /// Adapter index of each entry in `scored`.
    ranks: Vec<usize>,
    best: Option<usize>,
    pv: Vec<M>,
    complete: bool,
    good_enough: bool,
}

/// Largest alpha that still lets a move scoring exactly `score` through as
/// an exact value.
fn just_below(score: f64) -> f64 {
    score - (score.abs() * 1e-12).max(1e-12)
}

pub struct AlphaBetaEngine<G: GameAdapter> {
    config: Arc<SearchConfig>,
    killers: KillerTable<G::Move>,
    history: DigestHistory,
    pv_table: Vec<Vec<G::Move>>,
    root_player: Player,
    nodes_searched: u64,
    killer_cutoffs: u64,
    timed_out: bool,
}

impl<G: GameAdapter> AlphaBetaEngine<G> {
    pub fn new(config: Arc<SearchConfig>) -> Self {
        Self {
            config,
            killers: KillerTable::new(),
            history: DigestHistory::default(),
            pv_table: Vec::new(),
            root_player: 0,
            nodes_searched: 0,
            killer_cutoffs: 0,
            timed_out: false,
        }
    }

    fn check_time(&mut self, budget: &SearchBudget) -> bool {
        if !self.timed_out && budget.expired() {
            self.timed_out = true;
        }
        self.timed_out
    }

    fn prepare_pv(&mut self, ply: usize) {
        while self.pv_table.len() < ply + 2 {
            self.pv_table.push(Vec::new());
        }
        if let Some(row) = self.pv_table.get_mut(ply) {
            row.clear();
        }
    }

    fn update_pv(&mut self, ply: usize, mv: &G::Move) {
        let (head, tail) = self.pv_table.split_at_mut(ply + 1);
        if let (Some(row), Some(child)) = (head.last_mut(), tail.first()) {
            row.clear();
            row.push(mv.clone());
            row.extend(child.iter().cloned());
        }
    }

    fn terminal_score(&self, position: &G, ply: usize) -> f64 {
        match position.winner() {
            Some(w) if w == self.root_player => eval::win_score(ply),
            Some(_) => eval::loss_score(ply),
            None => eval::settle(position.evaluate(self.root_player), ply),
        }
    }

    /// Static score of the position after `mv`, `ply` plies below the root.
    fn static_score(
        &self,
        line: &mut SearchLine<G>,
        mv: &G::Move,
        ply: usize,
    ) -> Result<f64, SearchError> {
        line.make(mv);
        let position = line.position();
        let score = if position.is_terminal() {
            self.terminal_score(position, ply)
        } else {
            eval::settle(position.evaluate(self.root_player), ply)
        };
        line.unmake(mv)?;
        Ok(score)
    }

    /// Stable sort of `moves` by one-ply static score, best for the side to
    /// move first.
    fn sort_by_static_score<T>(
        &self,
        line: &mut SearchLine<G>,
        moves: Vec<T>,
        ply: usize,
        maximizing: bool,
        mv_of: impl Fn(&T) -> &G::Move,
    ) -> Result<Vec<T>, SearchError> {
        let mut keyed = Vec::with_capacity(moves.len());
        for item in moves {
            let key = self.static_score(line, mv_of(&item), ply + 1)?;
            keyed.push((key, item));
        }
        keyed.sort_by(|a, b| {
            if maximizing {
                b.0.total_cmp(&a.0)
            } else {
                a.0.total_cmp(&b.0)
            }
        });
        Ok(keyed.into_iter().map(|(_, item)| item).collect())
    }

    /// Score of the position on `line` from the root player's point of view,
    /// or `None` once the budget has run out.
    fn alpha_beta(
        &mut self,
        line: &mut SearchLine<G>,
        mut alpha: f64,
        mut beta: f64,
        ply: usize,
        depth: usize,
        budget: &SearchBudget,
    ) -> Result<Option<f64>, SearchError> {
        self.nodes_searched += 1;
        if self.check_time(budget) {
            return Ok(None);
        }
        self.prepare_pv(ply);

        let position = line.position();
        // Third occurrence of a position
        let digest = position.digest();
        if position.repetition_is_draw() && self.history.occurrences(digest) >= 2 {
            return Ok(Some(0.0));
        }

        if position.is_terminal() {
            return Ok(Some(self.terminal_score(position, ply)));
        }

        if position.depth_limit(ply, depth) {
            let raw = position.evaluate(self.root_player);
            return Ok(Some(eval::settle(raw, ply)));
        }

        let maximizing = position.to_move() == self.root_player;
        let mut moves = line.legal_moves()?;
        if self.config.static_sort {
            moves = self.sort_by_static_score(line, moves, ply, maximizing, |mv| mv)?;
        }
        let killer_count = if self.config.killer_moves {
            self.killers.promote(ply, &mut moves)
        } else {
            0
        };

        self.history.push(digest);
        let mut best = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };

        for (i, mv) in moves.iter().enumerate() {
            line.make(mv);
            let result = self.alpha_beta(line, alpha, beta, ply + 1, depth, budget)?;
            line.unmake(mv)?;
            let Some(score) = result else {
                self.history.pop();
                return Ok(None);
            };

            if maximizing {
                if score > best {
                    best = score;
                    self.update_pv(ply, mv);
                }
                alpha = alpha.max(score);
            } else {
                if score < best {
                    best = score;
                    self.update_pv(ply, mv);
                }
                beta = beta.min(score);
            }

            if alpha >= beta {
                if self.config.killer_moves {
                    if i < killer_count {
                        self.killer_cutoffs += 1;
                    }
                    self.killers.store(ply, mv);
                }
                break;
            }
        }

        self.history.pop();
        Ok(Some(best))
    }

    /// One pass over the root moves at `depth`. With `full_window` every move
    /// gets an exact score; otherwise later moves only need to prove they are
    /// not better than the current best. Equal scores go to the move the
    /// adapter listed first, whatever order the pass visits them in.
    fn search_root(
        &mut self,
        line: &mut SearchLine<G>,
        moves: &[RankedMove<G::Move>],
        depth: usize,
        full_window: bool,
        budget: &SearchBudget,
    ) -> Result<RootPass<G::Move>, SearchError> {
        self.prepare_pv(0);
        let root_digest = line.position().digest();
        self.history.push(root_digest);

        let mut pass = RootPass {
            scored: Vec::with_capacity(moves.len()),
            ranks: Vec::with_capacity(moves.len()),
            best: None,
            pv: Vec::new(),
            complete: true,
            good_enough: false,
        };
        let mut best_score = f64::NEG_INFINITY;
        let mut best_rank = usize::MAX;

        for (rank, mv) in moves {
            let alpha = if full_window || pass.best.is_none() {
                f64::NEG_INFINITY
            } else if *rank < best_rank {
                // Has to show a tie exactly to take over.
                just_below(best_score)
            } else {
                best_score
            };
            line.make(mv);
            let result = self.alpha_beta(line, alpha, f64::INFINITY, 1, depth, budget)?;
            line.unmake(mv)?;
            let Some(score) = result else {
                pass.complete = false;
                break;
            };

            let better = pass.best.is_none()
                || score > best_score
                || (score == best_score && *rank < best_rank);
            if better {
                best_score = score;
                best_rank = *rank;
                pass.best = Some(pass.scored.len());
                self.update_pv(0, mv);
                pass.pv = self.pv_table.first().cloned().unwrap_or_default();
            }
            pass.scored.push((mv.clone(), score));
            pass.ranks.push(*rank);

            if !full_window
                && self
                    .config
                    .good_enough_score
                    .is_some_and(|limit| best_score > limit)
            {
                pass.good_enough = true;
                break;
            }
        }

        self.history.pop();
        Ok(pass)
    }

    fn reset(&mut self, position: &G) {
        self.killers.clear();
        self.history.reset(position.prior_digests());
        self.root_player = position.to_move();
        self.nodes_searched = 0;
        self.killer_cutoffs = 0;
        self.timed_out = false;
    }
}

impl<G: GameAdapter> Searcher<G> for AlphaBetaEngine<G> {
    fn search(
        &mut self,
        position: &G,
        budget: &SearchBudget,
    ) -> Result<SearchOutcome<G::Move>, SearchError> {
        self.reset(position);
        let mut line = SearchLine::new(position.clone(), self.config.verify_digests);
        let mut outcome = SearchOutcome::empty(EngineKind::AlphaBeta);

        let mut root_moves: Vec<RankedMove<G::Move>> =
            line.legal_moves()?.into_iter().enumerate().collect();
        if root_moves.is_empty() {
            return Ok(outcome);
        }

        if self.config.single_choice_optimization && root_moves.len() == 1 {
            if let Some((_, mv)) = root_moves.pop() {
                let score = self.static_score(&mut line, &mv, 1)?;
                log::debug!("single legal move {mv:?}, not searching");
                outcome.score = score;
                outcome.principal_variation = vec![mv.clone()];
                outcome.root_children = vec![RootChild {
                    mv: mv.clone(),
                    score,
                    visits: 0,
                }];
                outcome.best_move = Some(mv);
            }
            outcome.stats.time_ms = budget.elapsed_ms();
            return Ok(outcome);
        }

        let window = RandomizationWindow::new(
            self.config.randomization_window,
            self.config.randomization_margin,
        );
        let randomize = window.is_active(position.move_number());
        let max_depth = if randomize {
            self.config
                .max_depth
                .saturating_sub(self.config.randomization_depth_reduction)
                .max(1)
        } else {
            self.config.max_depth
        };
        let first_depth = if budget.has_time_limit() { 1 } else { max_depth };
        let mut rng = self
            .config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        if randomize {
            shuffle_root(&mut root_moves, &mut rng);
        } else if self.config.static_sort {
            root_moves = self.sort_by_static_score(&mut line, root_moves, 0, true, |(_, mv)| mv)?;
        }

        let mut completed: Option<RootPass<G::Move>> = None;
        let mut partial: Option<RootPass<G::Move>> = None;

        for depth in first_depth..=max_depth {
            if completed.is_some() && budget.past_fraction(SOFT_LIMIT) {
                break;
            }
            let pass = self.search_root(&mut line, &root_moves, depth, randomize, budget)?;
            if !pass.complete {
                log::debug!("depth {depth} interrupted after {} root moves", pass.scored.len());
                if completed.is_none() {
                    partial = Some(pass);
                }
                break;
            }

            let best_score = pass
                .best
                .and_then(|i| pass.scored.get(i))
                .map_or(0.0, |(_, s)| *s);
            outcome.stats.depth = depth;
            log::debug!(
                "depth {depth}: score {best_score}, nodes {}",
                self.nodes_searched
            );

            let good_enough = pass.good_enough;
            // Search the previous best first on the next iteration.
            if let Some(best) = pass.best {
                if let Some(front) = root_moves.get_mut(..=best) {
                    front.rotate_right(1);
                }
            }
            completed = Some(pass);
            if good_enough {
                log::debug!("depth {depth}: score {best_score} is good enough, stopping");
                outcome.stats.good_enough_cutoffs += 1;
                break;
            }
            if is_win_score(best_score) || is_loss_score(best_score) {
                break;
            }
        }

        let Some(pass) = completed.or(partial) else {
            outcome.stats.nodes = self.nodes_searched;
            outcome.stats.time_ms = budget.elapsed_ms();
            return Ok(outcome);
        };

        let chosen = if randomize {
            window.choose(position.move_number(), &pass.scored, &mut rng)
        } else {
            pass.best
        };

        if let Some((mv, score)) = chosen.and_then(|i| pass.scored.get(i)) {
            outcome.best_move = Some(mv.clone());
            outcome.score = *score;
            outcome.principal_variation = if Some(mv) == pass.pv.first() {
                pass.pv.clone()
            } else {
                vec![mv.clone()]
            };
        }
        let mut children: Vec<(usize, RootChild<G::Move>)> = pass
            .ranks
            .into_iter()
            .zip(pass.scored)
            .map(|(rank, (mv, score))| {
                (
                    rank,
                    RootChild {
                        mv,
                        score,
                        visits: 0,
                    },
                )
            })
            .collect();
        children.sort_by_key(|(rank, _)| *rank);
        outcome.root_children = children.into_iter().map(|(_, child)| child).collect();
        outcome.stats.nodes = self.nodes_searched;
        outcome.stats.killer_cutoffs = self.killer_cutoffs;
        outcome.stats.time_ms = budget.elapsed_ms();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::game_tree::GameTree;
    use crate::logic::nim::Nim;

    fn fixed_depth(depth: usize) -> Arc<SearchConfig> {
        Arc::new(SearchConfig {
            time_per_move_ms: None,
            max_depth: depth,
            verify_digests: true,
            ..SearchConfig::default()
        })
    }

    #[test]
    fn picks_the_better_subtree() {
        // Root has two replies: the left one lets the opponent pick 3 or 5,
        // the right one 2 or 9. Minimax value is 3 through the left child.
        let tree = GameTree::builder()
            .node(0, &[1, 2])
            .node(1, &[3, 4])
            .node(2, &[5, 6])
            .leaf(3, 3.0)
            .leaf(4, 5.0)
            .leaf(5, 2.0)
            .leaf(6, 9.0)
            .build();
        let mut engine = AlphaBetaEngine::new(fixed_depth(4));
        let outcome = engine
            .search(&tree, &SearchBudget::unlimited())
            .unwrap();
        assert_eq!(outcome.best_move, Some(1));
        assert!((outcome.score - 3.0).abs() < 1e-9);
        assert_eq!(outcome.principal_variation, vec![1, 3]);
        assert_eq!(outcome.stats.depth, 4);
    }

    #[test]
    fn finds_the_winning_nim_move() {
        // Heap 5, take up to 3: taking 1 leaves a multiple of 4.
        let nim = Nim::new(5, 3);
        let mut engine = AlphaBetaEngine::new(fixed_depth(8));
        let outcome = engine.search(&nim, &SearchBudget::unlimited()).unwrap();
        assert_eq!(outcome.best_move.map(|m| m.take), Some(1));
        assert!(is_win_score(outcome.score));
    }

    #[test]
    fn timed_out_search_keeps_a_move() {
        let nim = Nim::new(40, 3);
        let config = Arc::new(SearchConfig {
            max_depth: 40,
            ..SearchConfig::default()
        });
        let mut engine = AlphaBetaEngine::new(config);
        let budget = SearchBudget::with_time_limit(std::time::Duration::from_millis(30));
        let outcome = engine.search(&nim, &budget).unwrap();
        assert!(outcome.best_move.is_some());
        assert!(outcome.stats.depth >= 1);
    }
}
