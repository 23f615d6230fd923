use rand::seq::SliceRandom;
use rand::Rng;

const MAX_PLY: usize = 64;

/// Two killer slots per ply. A newer killer pushes the older one into the
/// second slot.
#[derive(Debug, Clone)]
pub struct KillerTable<M> {
    slots: Vec<[Option<M>; 2]>,
}

impl<M: Clone + PartialEq> Default for KillerTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone + PartialEq> KillerTable<M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_PLY).map(|_| [None, None]).collect(),
        }
    }

    pub fn clear(&mut self) {
        for killers in &mut self.slots {
            *killers = [None, None];
        }
    }

    pub fn store(&mut self, ply: usize, mv: &M) {
        // Shift: 0 -> 1, new -> 0
        if let Some(killers) = self.slots.get_mut(ply) {
            if killers[0].as_ref() != Some(mv) {
                killers[1] = killers[0].take();
                killers[0] = Some(mv.clone());
            }
        }
    }

    #[must_use]
    pub fn killers(&self, ply: usize) -> Option<&[Option<M>; 2]> {
        self.slots.get(ply)
    }

    /// Move this ply's killers to the front of `moves`, keeping the relative
    /// order of everything else. Killers that are not legal here are ignored.
    /// Returns how many moves were promoted.
    pub fn promote(&self, ply: usize, moves: &mut [M]) -> usize {
        let Some(killers) = self.slots.get(ply) else {
            return 0;
        };
        let mut front = 0;
        for killer in killers.iter().flatten() {
            let Some(pos) = moves.iter().position(|m| m == killer) else {
                continue;
            };
            if pos >= front {
                moves[front..=pos].rotate_right(1);
                front += 1;
            }
        }
        front
    }
}

/// Opening variety: on the first `window` moves of a game, play any move
/// whose score is within a margin of the best. The margin shrinks linearly
/// to zero as the window closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomizationWindow {
    pub window: usize,
    pub margin: f64,
}

impl RandomizationWindow {
    #[must_use]
    pub const fn new(window: usize, margin: f64) -> Self {
        Self { window, margin }
    }

    #[must_use]
    pub fn is_active(&self, move_number: usize) -> bool {
        self.window > 0 && self.margin > 0.0 && (1..=self.window).contains(&move_number)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn effective_margin(&self, move_number: usize) -> f64 {
        if !self.is_active(move_number) {
            return 0.0;
        }
        let remaining = (self.window - move_number + 1) as f64;
        self.margin * remaining / self.window as f64
    }

    /// Index into `scored` of the move to play. Outside the window this is
    /// the first best-scoring move.
    pub fn choose<M, R: Rng + ?Sized>(
        &self,
        move_number: usize,
        scored: &[(M, f64)],
        rng: &mut R,
    ) -> Option<usize> {
        let best = best_index(scored)?;
        if !self.is_active(move_number) {
            return Some(best);
        }
        let best_score = scored.get(best).map_or(0.0, |(_, s)| *s);
        let margin = self.effective_margin(move_number);
        let eligible: Vec<usize> = scored
            .iter()
            .enumerate()
            .filter(|(_, (_, s))| best_score - *s < margin)
            .map(|(i, _)| i)
            .collect();
        eligible.choose(rng).copied().or(Some(best))
    }
}

/// First index holding the maximum score.
fn best_index<M>(scored: &[(M, f64)]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, (_, s)) in scored.iter().enumerate() {
        if best.map_or(true, |(_, b)| *s > b) {
            best = Some((i, *s));
        }
    }
    best.map(|(i, _)| i)
}

/// Root moves are shuffled while randomizing so an interrupted pass is not
/// biased towards the adapter's first moves.
pub fn shuffle_root<M, R: Rng + ?Sized>(moves: &mut [M], rng: &mut R) {
    moves.shuffle(rng);
}
