//! An explicit game tree with fixed leaf values. Useful where the exact
//! minimax value has to be known in advance.

use crate::engine::adapter::{GameAdapter, Player};
use crate::engine::eval::{self, WIN};
use crate::engine::zobrist::ZobristKeys;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type NodeIndex = usize;

#[derive(Debug, Clone, Default)]
struct TreeNode {
    children: Vec<NodeIndex>,
    /// Static value for player 0.
    value: f64,
    winner: Option<Player>,
    depth: usize,
}

#[derive(Debug)]
struct Shape {
    nodes: Vec<TreeNode>,
    keys: ZobristKeys,
}

/// Position inside a [`GameTree`]; moves are the indices of child nodes.
/// Players alternate by depth, player 0 at the root.
#[derive(Debug, Clone)]
pub struct GameTree {
    shape: Arc<Shape>,
    current: NodeIndex,
}

#[derive(Debug, Default)]
pub struct GameTreeBuilder {
    children: BTreeMap<NodeIndex, Vec<NodeIndex>>,
    values: BTreeMap<NodeIndex, f64>,
    winners: BTreeMap<NodeIndex, Player>,
}

impl GameTreeBuilder {
    #[must_use]
    pub fn node(mut self, id: NodeIndex, children: &[NodeIndex]) -> Self {
        self.children.insert(id, children.to_vec());
        self
    }

    #[must_use]
    pub fn leaf(mut self, id: NodeIndex, value: f64) -> Self {
        self.values.insert(id, value);
        self
    }

    /// Mark `id` as a finished game won by `player`.
    #[must_use]
    pub fn winner(mut self, id: NodeIndex, player: Player) -> Self {
        self.winners.insert(id, player);
        self
    }

    /// Nodes never mentioned are empty leaves worth 0. Interior nodes without
    /// an explicit value get the mean of the leaves below them.
    #[must_use]
    pub fn build(self) -> GameTree {
        let size = self
            .children
            .iter()
            .flat_map(|(id, kids)| std::iter::once(*id).chain(kids.iter().copied()))
            .chain(self.values.keys().copied())
            .chain(self.winners.keys().copied())
            .max()
            .map_or(1, |max| max + 1);
        let mut nodes = vec![TreeNode::default(); size];
        for (id, kids) in self.children {
            if let Some(node) = nodes.get_mut(id) {
                node.children = kids;
            }
        }
        for (id, player) in self.winners {
            if let Some(node) = nodes.get_mut(id) {
                node.winner = Some(player);
            }
        }

        for (id, value) in &self.values {
            if let Some(node) = nodes.get_mut(*id) {
                node.value = *value;
            }
        }

        assign_depths(&mut nodes);
        for id in 0..size {
            if self.values.contains_key(&id) {
                continue;
            }
            let value = mean_of_leaves(&nodes, id);
            if let Some(node) = nodes.get_mut(id) {
                node.value = value;
            }
        }

        GameTree {
            shape: Arc::new(Shape {
                keys: ZobristKeys::new(size, 2, 0x6A3E_7EE5_0000_0001),
                nodes,
            }),
            current: 0,
        }
    }
}

fn assign_depths(nodes: &mut [TreeNode]) {
    let mut stack = vec![(0, 0)];
    while let Some((id, depth)) = stack.pop() {
        let Some(node) = nodes.get_mut(id) else {
            continue;
        };
        node.depth = depth;
        stack.extend(node.children.iter().map(|c| (*c, depth + 1)));
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_of_leaves(nodes: &[TreeNode], id: NodeIndex) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        let Some(node) = nodes.get(current) else {
            continue;
        };
        if node.children.is_empty() {
            total += node.value;
            count += 1;
        } else {
            stack.extend(node.children.iter().copied());
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

impl GameTree {
    #[must_use]
    pub fn builder() -> GameTreeBuilder {
        GameTreeBuilder::default()
    }

    /// A uniform tree of the given depth whose nodes have 2..=`max_branching`
    /// children and integer leaf values in -50..=50.
    #[must_use]
    pub fn random(seed: u64, depth: usize, max_branching: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut builder = Self::builder();
        let mut frontier = vec![0];
        let mut next_id = 1;
        for _ in 0..depth {
            let mut next = Vec::new();
            for parent in frontier {
                let count = rng.gen_range(2..=max_branching.max(2));
                let kids: Vec<NodeIndex> = (next_id..next_id + count).collect();
                next_id += count;
                builder = builder.node(parent, &kids);
                next.extend(kids);
            }
            frontier = next;
        }
        for leaf in frontier {
            builder = builder.leaf(leaf, f64::from(rng.gen_range(-50_i32..=50)));
        }
        builder.build()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.nodes.is_empty()
    }

    fn node(&self) -> Option<&TreeNode> {
        self.shape.nodes.get(self.current)
    }

    /// Exact minimax score of the current node for player 0, searched to
    /// `max_depth` plies and scored the same way the alpha-beta engine does.
    #[must_use]
    pub fn minimax(&self, max_depth: usize) -> f64 {
        let root_player = self.to_move();
        let mut position = self.clone();
        minimax_at(&mut position, root_player, 0, max_depth)
    }
}

fn minimax_at(position: &mut GameTree, root: Player, ply: usize, max_depth: usize) -> f64 {
    if position.is_terminal() {
        return match position.winner() {
            Some(w) if w == root => eval::win_score(ply),
            Some(_) => eval::loss_score(ply),
            None => eval::settle(position.evaluate(root), ply),
        };
    }
    if ply >= max_depth {
        return eval::settle(position.evaluate(root), ply);
    }
    let maximizing = position.to_move() == root;
    let mut best = if maximizing {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    };
    for mv in position.legal_moves() {
        let undo = position.make(&mv);
        let score = minimax_at(position, root, ply + 1, max_depth);
        position.unmake(&mv, undo);
        best = if maximizing {
            best.max(score)
        } else {
            best.min(score)
        };
    }
    best
}

impl GameAdapter for GameTree {
    type Move = NodeIndex;
    type Undo = NodeIndex;

    fn legal_moves(&self) -> Vec<NodeIndex> {
        match self.node() {
            Some(node) if node.winner.is_none() => node.children.clone(),
            _ => Vec::new(),
        }
    }

    fn make(&mut self, mv: &NodeIndex) -> NodeIndex {
        std::mem::replace(&mut self.current, *mv)
    }

    fn unmake(&mut self, _mv: &NodeIndex, undo: NodeIndex) {
        self.current = undo;
    }

    fn evaluate(&self, player: Player) -> f64 {
        let Some(node) = self.node() else {
            return 0.0;
        };
        let value = match node.winner {
            Some(0) => WIN,
            Some(_) => -WIN,
            None => node.value,
        };
        if player == 0 {
            value
        } else {
            -value
        }
    }

    fn digest(&self) -> u64 {
        self.shape.keys.key(self.current) ^ self.shape.keys.side_key(self.to_move())
    }

    fn is_terminal(&self) -> bool {
        self.node()
            .map_or(true, |n| n.winner.is_some() || n.children.is_empty())
    }

    fn winner(&self) -> Option<Player> {
        self.node().and_then(|n| n.winner)
    }

    fn to_move(&self) -> Player {
        self.node().map_or(0, |n| n.depth % 2)
    }

    fn move_number(&self) -> usize {
        self.node().map_or(1, |n| n.depth + 1)
    }
}
