//! A node of the UCT tree.
//!
//! Nodes live in an arena owned by [`super::tree::UctTree`] and refer to each
//! other by [`NodeId`]. Statistics are kept from the point of view of the
//! player who made the move leading into the node.

use crate::engine::adapter::Player;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct UctNode<M> {
    /// Move that led here from the parent (`None` for the root).
    pub mv: Option<M>,
    /// Player who made `mv`.
    pub mover: Option<Player>,
    pub parent: Option<NodeId>,
    /// `None` until the node is expanded.
    pub children: Option<Vec<NodeId>>,
    pub visits: u32,
    /// Sum of rewards, from the mover's point of view, in [-visits, visits].
    pub wins: f64,
    /// Moves from the root.
    pub depth: usize,
    /// Game-theoretic value for the mover once known: 1 win, -1 loss, 0 draw.
    pub proven: Option<f64>,
    /// Never selected again.
    pub pruned: bool,
}

impl<M> UctNode<M> {
    #[must_use]
    pub const fn root() -> Self {
        Self {
            mv: None,
            mover: None,
            parent: None,
            children: None,
            visits: 0,
            wins: 0.0,
            depth: 0,
            proven: None,
            pruned: false,
        }
    }

    #[must_use]
    pub fn child(mv: M, mover: Player, parent: NodeId, depth: usize) -> Self {
        Self {
            mv: Some(mv),
            mover: Some(mover),
            parent: Some(parent),
            children: None,
            visits: 0,
            wins: 0.0,
            depth,
            proven: None,
            pruned: false,
        }
    }

    #[must_use]
    pub const fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    /// Average reward in [-1, 1], or 0 before the first visit.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.wins / f64::from(self.visits)
        }
    }

    /// `mean/2 + 0.5 + alpha * sqrt(ln(parent_visits) / (visits + 1))`.
    /// Unvisited nodes score +inf so every child is tried once.
    #[must_use]
    pub fn uct_score(&self, log_parent_visits: f64, alpha: f64) -> f64 {
        if self.visits == 0 {
            return f64::INFINITY;
        }
        let exploration = alpha * (log_parent_visits / (f64::from(self.visits) + 1.0)).sqrt();
        self.mean() / 2.0 + 0.5 + exploration
    }

    pub fn record(&mut self, reward: f64) {
        self.visits = self.visits.saturating_add(1);
        self.wins += reward;
    }
}
