use crate::engine::config::EngineKind;
use crate::engine::error::SearchError;
use crate::engine::eval;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

pub type Player = usize;

/// The narrow interface every game exposes to the engines. The implementing
/// type is the position itself; engines clone it once per search and then
/// mutate it in place through `make`/`unmake`.
///
/// All methods must be non-blocking and CPU-only.
pub trait GameAdapter: Clone + Send + Sync {
    /// Compared by value, independent of any undo bookkeeping.
    type Move: Clone + PartialEq + fmt::Debug + Send + Sync;
    /// Opaque data returned by `make` and handed back to `unmake`.
    type Undo: Send;

    /// Every move the engine should consider. Order is not significant.
    fn legal_moves(&self) -> Vec<Self::Move>;

    fn make(&mut self, mv: &Self::Move) -> Self::Undo;

    /// Exact inverse of the matching `make`.
    fn unmake(&mut self, mv: &Self::Move, undo: Self::Undo);

    /// Larger is better for `player`. A detected win must score `>= WIN`
    /// and a detected loss `<= -WIN`.
    fn evaluate(&self, player: Player) -> f64;

    fn digest(&self) -> u64;

    fn is_terminal(&self) -> bool;

    fn winner(&self) -> Option<Player>;

    fn to_move(&self) -> Player;

    /// 1-based number of the move about to be played in the real game.
    fn move_number(&self) -> usize;

    fn num_players(&self) -> usize {
        2
    }

    /// Lets a game stop a branch early, e.g. at a forced turn boundary.
    fn depth_limit(&self, current_depth: usize, max_depth: usize) -> bool {
        current_depth >= max_depth
    }

    /// The `done` move to offer when the game signals completion.
    fn pass_move(&self) -> Option<Self::Move> {
        None
    }

    /// Cheap move for playouts. Games with expensive move generation
    /// should override it.
    fn random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Self::Move> {
        self.legal_moves().choose(rng).cloned()
    }

    /// Playout value in [-1, 1] for `player`.
    fn normalized_score(&self, player: Player) -> f64 {
        match self.winner() {
            Some(w) if w == player => 1.0,
            Some(_) => -1.0,
            None if self.is_terminal() => 0.0,
            None => eval::squash(self.evaluate(player)),
        }
    }

    /// Digests of the positions that led to this one in the real game.
    fn prior_digests(&self) -> Vec<u64> {
        Vec::new()
    }

    fn repetition_is_draw(&self) -> bool {
        false
    }

    /// Engine to use when the controller is left on `Auto`.
    fn preferred_engine(&self) -> EngineKind {
        EngineKind::AlphaBeta
    }
}

struct LineEntry<G: GameAdapter> {
    mv: G::Move,
    undo: G::Undo,
    digest: u64,
}

/// A position plus the stack of moves made on it during a search. Enforces
/// make/unmake stack discipline and, when `verify` is set, checks that every
/// unmake restores the digest seen before the matching make.
pub struct SearchLine<G: GameAdapter> {
    position: G,
    stack: Vec<LineEntry<G>>,
    verify: bool,
}

impl<G: GameAdapter> SearchLine<G> {
    #[must_use]
    pub fn new(position: G, verify: bool) -> Self {
        Self {
            position,
            stack: Vec::with_capacity(64),
            verify,
        }
    }

    #[must_use]
    pub const fn position(&self) -> &G {
        &self.position
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn make(&mut self, mv: &G::Move) {
        let digest = if self.verify {
            self.position.digest()
        } else {
            0
        };
        let undo = self.position.make(mv);
        self.stack.push(LineEntry {
            mv: mv.clone(),
            undo,
            digest,
        });
    }

    pub fn unmake(&mut self, mv: &G::Move) -> Result<(), SearchError> {
        let depth = self.stack.len();
        let Some(entry) = self.stack.pop() else {
            return Err(SearchError::UnmakeOutOfOrder {
                depth,
                detail: format!("unmake of {mv:?} with no move on the stack"),
            });
        };
        if entry.mv != *mv {
            let detail = format!("expected {:?}, got {mv:?}", entry.mv);
            self.stack.push(entry);
            return Err(SearchError::UnmakeOutOfOrder { depth, detail });
        }
        self.position.unmake(&entry.mv, entry.undo);
        if self.verify {
            let found = self.position.digest();
            if found != entry.digest {
                return Err(SearchError::DigestMismatch {
                    expected: entry.digest,
                    found,
                    depth,
                });
            }
        }
        Ok(())
    }

    /// Unmake moves until only `depth` remain on the stack.
    pub fn unwind_to(&mut self, depth: usize) -> Result<(), SearchError> {
        while self.stack.len() > depth {
            let Some(mv) = self.stack.last().map(|e| e.mv.clone()) else {
                break;
            };
            self.unmake(&mv)?;
        }
        Ok(())
    }

    /// Legal moves, with an empty list on a live position reported as the
    /// adapter fault it is.
    pub fn legal_moves(&self) -> Result<Vec<G::Move>, SearchError> {
        checked_legal_moves(&self.position)
    }

    pub fn moves(&self) -> impl Iterator<Item = &G::Move> {
        self.stack.iter().map(|e| &e.mv)
    }
}

pub fn checked_legal_moves<G: GameAdapter>(position: &G) -> Result<Vec<G::Move>, SearchError> {
    let moves = position.legal_moves();
    if moves.is_empty() && !position.is_terminal() {
        return Err(SearchError::NoLegalMoves {
            digest: position.digest(),
        });
    }
    Ok(moves)
}
