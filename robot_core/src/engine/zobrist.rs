use crate::engine::adapter::Player;

/// Per-feature random constants for Zobrist-style digests. An adapter XORs
/// the key of every feature present in its position, plus the side key of
/// the player to move.
#[derive(Debug, Clone)]
pub struct ZobristKeys {
    feature_keys: Vec<u64>,
    side_keys: Vec<u64>,
}

// Simple XorShift RNG so keys are identical in every process
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    const fn new(seed: u64) -> Self {
        // xorshift is stuck at zero
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl ZobristKeys {
    #[must_use]
    pub fn new(features: usize, players: usize, seed: u64) -> Self {
        let mut rng = XorShift64::new(seed);
        let feature_keys = (0..features).map(|_| rng.next()).collect();
        let side_keys = (0..players).map(|_| rng.next()).collect();
        Self {
            feature_keys,
            side_keys,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.feature_keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feature_keys.is_empty()
    }

    /// Panics if `feature` is outside the table; that is an adapter bug.
    #[must_use]
    pub fn key(&self, feature: usize) -> u64 {
        #[allow(clippy::indexing_slicing)]
        self.feature_keys[feature]
    }

    #[must_use]
    pub fn side_key(&self, player: Player) -> u64 {
        #[allow(clippy::indexing_slicing)]
        self.side_keys[player]
    }
}

/// Ancestor digests of the current line: the game so far followed by the
/// positions on the search path. Used for repetition draws.
#[derive(Debug, Clone, Default)]
pub struct DigestHistory {
    digests: Vec<u64>,
}

impl DigestHistory {
    #[must_use]
    pub fn new(prior: Vec<u64>) -> Self {
        Self { digests: prior }
    }

    pub fn reset(&mut self, prior: Vec<u64>) {
        self.digests = prior;
    }

    pub fn push(&mut self, digest: u64) {
        self.digests.push(digest);
    }

    pub fn pop(&mut self) -> Option<u64> {
        self.digests.pop()
    }

    #[must_use]
    pub fn occurrences(&self, digest: u64) -> usize {
        self.digests.iter().filter(|&&d| d == digest).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}
