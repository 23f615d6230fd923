use crate::engine::adapter::Player;

/// Score magnitude of a proven win. Positional scores must stay below it.
pub const WIN: f64 = 1.0e8;

/// Win found `depth` plies below the root. Faster wins score strictly higher.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn win_score(depth: usize) -> f64 {
    WIN + 1.0 / (1.0 + depth as f64)
}

#[must_use]
pub fn loss_score(depth: usize) -> f64 {
    -win_score(depth)
}

#[must_use]
pub fn is_win_score(score: f64) -> bool {
    score >= WIN
}

#[must_use]
pub fn is_loss_score(score: f64) -> bool {
    score <= -WIN
}

/// Collapse a raw adapter score at `depth`: anything at or beyond the win
/// sentinel becomes the exact depth-tagged win or loss, so positional residue
/// never rides along with a proven result.
#[must_use]
pub fn settle(raw: f64, depth: usize) -> f64 {
    if is_win_score(raw) {
        win_score(depth)
    } else if is_loss_score(raw) {
        loss_score(depth)
    } else {
        raw
    }
}

/// Map a raw heuristic into [-1, 1] for playout rewards.
#[must_use]
pub fn squash(raw: f64) -> f64 {
    if is_win_score(raw) {
        1.0
    } else if is_loss_score(raw) {
        -1.0
    } else if raw.is_nan() {
        0.0
    } else {
        raw / (1.0 + raw.abs())
    }
}

/// Reward for a win that took `depth` plies, in (0.8, 1.0].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decayed_win_reward(depth: usize) -> f64 {
    0.8 + 0.2 / depth.max(1) as f64
}

/// Playout reward for `player` at a finished game.
#[must_use]
pub fn terminal_reward(
    winner: Option<Player>,
    player: Player,
    depth: usize,
    win_loss_only: bool,
) -> Option<f64> {
    let magnitude = if win_loss_only {
        1.0
    } else {
        decayed_win_reward(depth)
    };
    winner.map(|w| if w == player { magnitude } else { -magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faster_wins_outrank_slower_ones() {
        assert!(win_score(1) > win_score(2));
        assert!(win_score(2) > win_score(10));
        assert!(win_score(100) > WIN);
        assert!(loss_score(1) < loss_score(5));
    }

    #[test]
    fn settle_drops_positional_residue() {
        assert!((settle(WIN + 12_345.0, 3) - win_score(3)).abs() < f64::EPSILON);
        assert!((settle(-WIN - 7.0, 2) - loss_score(2)).abs() < f64::EPSILON);
        assert!((settle(42.5, 7) - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn squash_stays_in_range() {
        for raw in [-WIN * 2.0, -1e6, -3.0, 0.0, 0.5, 1e6, WIN] {
            let v = squash(raw);
            assert!((-1.0..=1.0).contains(&v), "{raw} -> {v}");
        }
        assert!(squash(f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn decayed_rewards_prefer_faster_wins() {
        assert!((decayed_win_reward(1) - 1.0).abs() < f64::EPSILON);
        assert!(decayed_win_reward(2) > decayed_win_reward(5));
        assert!(decayed_win_reward(1000) > 0.8);
        assert_eq!(terminal_reward(Some(1), 1, 4, true), Some(1.0));
        assert_eq!(terminal_reward(Some(0), 1, 4, true), Some(-1.0));
        assert_eq!(terminal_reward(None, 1, 4, false), None);
    }
}
