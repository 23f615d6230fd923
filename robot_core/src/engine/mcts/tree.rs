//! Arena-backed UCT tree. Nodes are stored in a contiguous `Vec` and refer
//! to each other by [`NodeId`]; the tree is only ever grown during a search.
//!
//! With the only-child optimization, a node that is its parent's single
//! child keeps no statistics of its own: it mirrors the nearest ancestor
//! that does.

use super::node::{NodeId, UctNode};
use crate::engine::adapter::Player;
use rand::Rng;
use std::cmp::Ordering;

#[derive(Debug)]
pub struct UctTree<M> {
    nodes: Vec<UctNode<M>>,
    only_child: bool,
}

impl<M: Clone> Default for UctTree<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone> UctTree<M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![UctNode::root()],
            only_child: false,
        }
    }

    #[must_use]
    pub fn with_only_child_optimization(mut self, enabled: bool) -> Self {
        self.only_child = enabled;
        self
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&UctNode<M>> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut UctNode<M>> {
        self.nodes.get_mut(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn root(&self) -> Option<&UctNode<M>> {
        self.get(NodeId::ROOT)
    }

    /// Deepest node in the tree.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Create one child per move, in the given order. Returns how many nodes
    /// were added; an already expanded node is left untouched.
    #[allow(clippy::cast_possible_truncation)]
    pub fn expand(&mut self, parent: NodeId, moves: Vec<M>, mover: Player) -> usize {
        let Some(depth) = self
            .get(parent)
            .filter(|n| !n.is_expanded())
            .map(|n| n.depth + 1)
        else {
            return 0;
        };
        let first = self.nodes.len();
        let count = moves.len();
        self.nodes.extend(
            moves
                .into_iter()
                .map(|mv| UctNode::child(mv, mover, parent, depth)),
        );
        let ids = (first..first + count).map(|i| NodeId(i as u32)).collect();
        if let Some(node) = self.get_mut(parent) {
            node.children = Some(ids);
        }
        count
    }

    /// Seed the children of `parent` with `weight` virtual visits each, at
    /// the given prior rewards (mover's point of view, in [-1, 1]).
    pub fn seed_children(&mut self, parent: NodeId, priors: &[f64], weight: u32) {
        if weight == 0 {
            return;
        }
        let children = self
            .get(parent)
            .and_then(|n| n.children.clone())
            .unwrap_or_default();
        for (child, prior) in children.into_iter().zip(priors) {
            if self.skips_statistics(child) {
                continue;
            }
            if let Some(node) = self.get_mut(child) {
                node.visits = node.visits.saturating_add(weight);
                node.wins += prior.clamp(-1.0, 1.0) * f64::from(weight);
            }
        }
    }

    /// True for a node whose parent has exactly one child while the
    /// only-child optimization is on.
    #[must_use]
    pub fn skips_statistics(&self, id: NodeId) -> bool {
        self.only_child
            && self
                .get(id)
                .and_then(|n| n.parent)
                .and_then(|p| self.get(p))
                .and_then(|p| p.children.as_ref())
                .is_some_and(|c| c.len() == 1)
    }

    /// Visit count of `id`, read through to the nearest ancestor that keeps
    /// statistics.
    #[must_use]
    pub fn visits(&self, id: NodeId) -> u32 {
        let mut current = id;
        while self.skips_statistics(current) {
            match self.get(current).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self.get(current).map_or(0, |n| n.visits)
    }

    /// Whether a leaf has been visited often enough to grow children.
    /// Nodes shallower than `tree_depth` are expanded unconditionally.
    /// With a zero rate a node expands on its third visit; otherwise once
    /// `visits * rate` exceeds the log of its parent's visits.
    #[must_use]
    pub fn should_expand(&self, id: NodeId, rate: f64, tree_depth: usize) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        if node.is_expanded() {
            return false;
        }
        if node.depth < tree_depth {
            return true;
        }
        let visits = self.visits(id);
        if rate <= 0.0 {
            return visits >= 3;
        }
        let parent_visits = node.parent.map_or(1, |p| self.visits(p).max(1));
        f64::from(visits) * rate > f64::from(parent_visits).ln()
    }

    /// Live (unpruned) children of `id`.
    #[must_use]
    pub fn live_children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id)
            .and_then(|n| n.children.as_ref())
            .map(|children| {
                children
                    .iter()
                    .copied()
                    .filter(|c| self.get(*c).is_some_and(|n| !n.pruned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Next child to descend into. Unvisited children come first (a random
    /// one when `randomize` is set); after that the highest UCT score wins,
    /// ties going to the less visited child and then to arena order.
    pub fn select_child<R: Rng + ?Sized>(
        &self,
        id: NodeId,
        alpha: f64,
        only_child: bool,
        randomize: bool,
        rng: &mut R,
    ) -> Option<NodeId> {
        let live = self.live_children(id);
        if only_child && live.len() == 1 {
            return live.first().copied();
        }

        let unvisited: Vec<NodeId> = live
            .iter()
            .copied()
            .filter(|c| self.get(*c).is_some_and(|n| n.visits == 0))
            .collect();
        if !unvisited.is_empty() {
            let pick = if randomize {
                rng.gen_range(0..unvisited.len())
            } else {
                0
            };
            return unvisited.get(pick).copied();
        }

        let log_parent = f64::from(self.visits(id).max(1)).ln();
        let mut best: Option<(NodeId, f64, u32)> = None;
        for child in live {
            let Some(node) = self.get(child) else {
                continue;
            };
            let score = node.uct_score(log_parent, alpha);
            let better = match best {
                None => true,
                Some((_, s, v)) => score > s || (score == s && node.visits < v),
            };
            if better {
                best = Some((child, score, node.visits));
            }
        }
        best.map(|(child, _, _)| child)
    }

    /// Add `reward` (from `reward_player`'s point of view) to every node from
    /// `leaf` up to the root.
    pub fn backpropagate(&mut self, leaf: NodeId, reward: f64, reward_player: Player) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let skip = self.skips_statistics(id);
            let Some(node) = self.get_mut(id) else {
                break;
            };
            if !skip {
                let value = match node.mover {
                    Some(p) if p != reward_player => -reward,
                    _ => reward,
                };
                node.record(value);
            }
            current = node.parent;
        }
    }

    /// Record a game-theoretic `value` (for the node's mover) and propagate
    /// what follows from it. A win decides the parent; a parent whose
    /// children are all proven takes the best of them. With `dead_child`
    /// set, the siblings of a win and a proven loss are never selected again.
    ///
    /// Returns true once the root is decided.
    pub fn prove(&mut self, id: NodeId, value: f64, dead_child: bool) -> bool {
        let mut id = id;
        let mut value = value;
        loop {
            let Some(node) = self.get_mut(id) else {
                return false;
            };
            if node.proven.is_some() {
                return false;
            }
            node.proven = Some(value);
            let mover = node.mover;
            let Some(parent) = node.parent else {
                return true;
            };

            if value < 0.0 && dead_child {
                if let Some(node) = self.get_mut(id) {
                    node.pruned = true;
                }
            }

            let siblings = self
                .get(parent)
                .and_then(|n| n.children.clone())
                .unwrap_or_default();

            let parent_value = if value > 0.0 {
                if dead_child {
                    for sibling in siblings.iter().copied().filter(|s| *s != id) {
                        if let Some(node) = self.get_mut(sibling) {
                            node.pruned = true;
                        }
                    }
                }
                Some(value)
            } else {
                siblings
                    .iter()
                    .map(|s| self.get(*s).and_then(|n| n.proven))
                    .try_fold(f64::NEG_INFINITY, |best, v| v.map(|v| best.max(v)))
            };

            let Some(child_value) = parent_value else {
                return false;
            };
            if parent == NodeId::ROOT {
                // The root has no mover; its value is for the side to move.
                if let Some(root) = self.get_mut(parent) {
                    root.proven = Some(child_value);
                }
                return true;
            }
            let parent_mover = self.get(parent).and_then(|n| n.mover);
            value = if parent_mover == mover {
                child_value
            } else {
                -child_value
            };
            id = parent;
        }
    }

    /// The root move to play: a proven win if there is one, otherwise the
    /// most visited child that is not a proven loss, ties going to the higher
    /// mean reward.
    #[must_use]
    pub fn best_child(&self, id: NodeId) -> Option<NodeId> {
        let children = self.get(id)?.children.as_ref()?;
        let nodes: Vec<(NodeId, &UctNode<M>)> = children
            .iter()
            .filter_map(|c| self.get(*c).map(|n| (*c, n)))
            .collect();

        if let Some((win, _)) = nodes.iter().find(|(_, n)| n.proven.is_some_and(|v| v > 0.0)) {
            return Some(*win);
        }

        let by_visits = |a: &&(NodeId, &UctNode<M>), b: &&(NodeId, &UctNode<M>)| {
            a.1.visits.cmp(&b.1.visits).then_with(|| {
                a.1.mean()
                    .partial_cmp(&b.1.mean())
                    .unwrap_or(Ordering::Equal)
            })
        };
        let not_lost = |n: &&(NodeId, &UctNode<M>)| !n.1.proven.is_some_and(|v| v < 0.0);

        // max_by returns the last maximum; iterate reversed so ties keep the
        // first child.
        nodes
            .iter()
            .rev()
            .filter(not_lost)
            .max_by(by_visits)
            .or_else(|| nodes.iter().rev().max_by(by_visits))
            .map(|(c, _)| *c)
    }

    /// Most visited line from the root.
    #[must_use]
    pub fn principal_variation(&self) -> Vec<M> {
        let mut line = Vec::new();
        let mut current = NodeId::ROOT;
        while let Some(child) = self.best_child(current) {
            let Some(node) = self.get(child) else {
                break;
            };
            if self.visits(child) == 0 && node.proven.is_none() {
                break;
            }
            if let Some(mv) = &node.mv {
                line.push(mv.clone());
            }
            current = child;
        }
        line
    }
}
