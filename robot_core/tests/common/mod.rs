#![allow(dead_code)]

use robot_core::engine::eval;
use robot_core::engine::zobrist::ZobristKeys;
use robot_core::engine::{GameAdapter, Player};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Plain minimax with the same scoring conventions as the alpha-beta engine.
pub fn minimax<G: GameAdapter>(position: &mut G, root: Player, ply: usize, max_depth: usize) -> f64 {
    if position.is_terminal() {
        return match position.winner() {
            Some(w) if w == root => eval::win_score(ply),
            Some(_) => eval::loss_score(ply),
            None => eval::settle(position.evaluate(root), ply),
        };
    }
    if position.depth_limit(ply, max_depth) {
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
        let score = minimax(position, root, ply + 1, max_depth);
        position.unmake(&mv, undo);
        best = if maximizing {
            best.max(score)
        } else {
            best.min(score)
        };
    }
    best
}

fn race_keys() -> &'static ZobristKeys {
    static KEYS: OnceLock<ZobristKeys> = OnceLock::new();
    KEYS.get_or_init(|| ZobristKeys::new(64, 2, 0xACE))
}

/// Ways a [`Race`] can misbehave.
#[derive(Debug, Clone, Default)]
pub enum Flaw {
    #[default]
    None,
    /// `unmake` forgets to hand the turn back.
    ForgetSide,
    /// No legal moves once the total reaches this value.
    NoMovesAt(u32),
    /// `legal_moves` panics at this total while the counter is above zero.
    PanicAt(u32, Arc<AtomicU32>),
}

/// Players add 1 or 2 to a running total; whoever reaches the target wins.
#[derive(Debug, Clone)]
pub struct Race {
    pub total: u32,
    pub target: u32,
    pub to_move: Player,
    pub moves_played: usize,
    pub last_mover: Option<Player>,
    pub flaw: Flaw,
}

impl Race {
    pub fn new(target: u32, flaw: Flaw) -> Self {
        Self {
            total: 0,
            target,
            to_move: 0,
            moves_played: 0,
            last_mover: None,
            flaw,
        }
    }
}

impl GameAdapter for Race {
    type Move = u32;
    type Undo = Option<Player>;

    fn legal_moves(&self) -> Vec<u32> {
        if self.is_terminal() {
            return Vec::new();
        }
        match &self.flaw {
            Flaw::NoMovesAt(at) if *at == self.total => return Vec::new(),
            Flaw::PanicAt(at, remaining) if *at == self.total => {
                let left = remaining.load(Ordering::SeqCst);
                if left > 0 {
                    remaining.store(left - 1, Ordering::SeqCst);
                    panic!("race adapter failure at {at}");
                }
            }
            _ => {}
        }
        vec![1, 2]
    }

    fn make(&mut self, mv: &u32) -> Option<Player> {
        let undo = self.last_mover;
        self.total += mv;
        self.last_mover = Some(self.to_move);
        self.to_move ^= 1;
        self.moves_played += 1;
        undo
    }

    fn unmake(&mut self, mv: &u32, undo: Option<Player>) {
        self.total -= mv;
        self.last_mover = undo;
        if !matches!(self.flaw, Flaw::ForgetSide) {
            self.to_move ^= 1;
        }
        self.moves_played -= 1;
    }

    fn evaluate(&self, player: Player) -> f64 {
        match self.winner() {
            Some(w) if w == player => eval::WIN,
            Some(_) => -eval::WIN,
            None => 0.0,
        }
    }

    fn digest(&self) -> u64 {
        race_keys().key(self.total as usize % 64) ^ race_keys().side_key(self.to_move)
    }

    fn is_terminal(&self) -> bool {
        self.total >= self.target
    }

    fn winner(&self) -> Option<Player> {
        if self.is_terminal() {
            self.last_mover
        } else {
            None
        }
    }

    fn to_move(&self) -> Player {
        self.to_move
    }

    fn move_number(&self) -> usize {
        self.moves_played + 1
    }
}

/// One decision: pick a move in `0..width`, after which the game is over and
/// worth `-index * step` to player 0.
#[derive(Debug, Clone)]
pub struct Flat {
    pub move_number: usize,
    pub width: usize,
    pub step: f64,
    pub chosen: Option<usize>,
    pub pass: bool,
}

impl Flat {
    pub fn new(move_number: usize, width: usize, step: f64) -> Self {
        Self {
            move_number,
            width,
            step,
            chosen: None,
            pass: false,
        }
    }
}

pub const PASS: usize = usize::MAX;

impl GameAdapter for Flat {
    type Move = usize;
    type Undo = ();

    fn legal_moves(&self) -> Vec<usize> {
        if self.chosen.is_some() {
            Vec::new()
        } else {
            (0..self.width).collect()
        }
    }

    fn make(&mut self, mv: &usize) {
        self.chosen = Some(*mv);
    }

    fn unmake(&mut self, _mv: &usize, (): ()) {
        self.chosen = None;
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&self, player: Player) -> f64 {
        let value = self.chosen.map_or(0.0, |c| -(c as f64) * self.step);
        if player == 0 {
            value
        } else {
            -value
        }
    }

    fn digest(&self) -> u64 {
        self.chosen
            .map_or(0x51, |c| (c as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn is_terminal(&self) -> bool {
        self.chosen.is_some()
    }

    fn winner(&self) -> Option<Player> {
        None
    }

    fn to_move(&self) -> Player {
        usize::from(self.chosen.is_some())
    }

    fn move_number(&self) -> usize {
        self.move_number + usize::from(self.chosen.is_some())
    }

    fn pass_move(&self) -> Option<usize> {
        self.pass.then_some(PASS)
    }
}
