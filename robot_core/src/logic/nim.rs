use crate::engine::adapter::{GameAdapter, Player};
use crate::engine::config::EngineKind;
use crate::engine::eval::WIN;
use crate::engine::zobrist::ZobristKeys;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const KEY_SEED: u64 = 0x004E_494D_5345_4544;
/// Heaps larger than this are left to the Monte Carlo engine.
const LARGE_HEAP: u32 = 24;

/// Subtraction game: players alternately take 1..=`max_take` stones from a
/// single heap, and whoever takes the last stone wins. A heap that is a
/// multiple of `max_take + 1` is lost for the side to move.
#[derive(Debug, Clone)]
pub struct Nim {
    heap: u32,
    max_take: u32,
    to_move: Player,
    last_mover: Option<Player>,
    moves_played: usize,
    keys: Arc<ZobristKeys>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NimMove {
    pub take: u32,
}

impl Nim {
    #[must_use]
    pub fn new(heap: u32, max_take: u32) -> Self {
        Self {
            heap,
            max_take: max_take.max(1),
            to_move: 0,
            last_mover: None,
            moves_played: 0,
            keys: Arc::new(ZobristKeys::new(heap as usize + 1, 2, KEY_SEED)),
        }
    }

    #[must_use]
    pub const fn heap(&self) -> u32 {
        self.heap
    }

    /// The move perfect play takes here, if the position is winning.
    #[must_use]
    pub const fn winning_take(&self) -> Option<u32> {
        let take = self.heap % (self.max_take + 1);
        if take == 0 {
            None
        } else {
            Some(take)
        }
    }
}

impl GameAdapter for Nim {
    type Move = NimMove;
    type Undo = Option<Player>;

    fn legal_moves(&self) -> Vec<NimMove> {
        (1..=self.max_take.min(self.heap))
            .map(|take| NimMove { take })
            .collect()
    }

    fn make(&mut self, mv: &NimMove) -> Option<Player> {
        let undo = self.last_mover;
        self.heap -= mv.take.min(self.heap);
        self.last_mover = Some(self.to_move);
        self.to_move ^= 1;
        self.moves_played += 1;
        undo
    }

    fn unmake(&mut self, mv: &NimMove, undo: Option<Player>) {
        self.heap += mv.take;
        self.last_mover = undo;
        self.to_move ^= 1;
        self.moves_played -= 1;
    }

    fn evaluate(&self, player: Player) -> f64 {
        match self.winner() {
            Some(w) if w == player => WIN,
            Some(_) => -WIN,
            None => 0.0,
        }
    }

    fn digest(&self) -> u64 {
        self.keys.key(self.heap as usize) ^ self.keys.side_key(self.to_move)
    }

    fn is_terminal(&self) -> bool {
        self.heap == 0
    }

    fn winner(&self) -> Option<Player> {
        if self.heap == 0 {
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

    fn preferred_engine(&self) -> EngineKind {
        if self.heap > LARGE_HEAP {
            EngineKind::MonteCarlo
        } else {
            EngineKind::AlphaBeta
        }
    }
}
