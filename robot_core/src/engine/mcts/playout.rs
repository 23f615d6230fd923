use crate::engine::adapter::{GameAdapter, Player, SearchLine};
use crate::engine::error::SearchError;
use crate::engine::eval;
use rand::seq::SliceRandom;
use rand::Rng;

/// Knobs a playout needs, copied out of the config once per search.
#[derive(Debug, Clone, Copy)]
pub struct PlayoutSettings {
    pub final_depth: usize,
    pub blitz: bool,
    pub win_loss_only: bool,
}

/// Play random moves from the position on `line` until the game ends or the
/// adapter's depth limit is hit, and score the result for `player` in
/// [-1, 1]. `tree_depth` is the number of moves already made inside the
/// tree, so a decayed win reward reflects the whole line.
///
/// The moves stay on `line`; callers either unwind it or throw it away.
pub fn playout<G, R>(
    line: &mut SearchLine<G>,
    player: Player,
    tree_depth: usize,
    settings: PlayoutSettings,
    rng: &mut R,
) -> Result<f64, SearchError>
where
    G: GameAdapter,
    R: Rng + ?Sized,
{
    let mut sim_depth = 0;
    loop {
        let position = line.position();
        if position.is_terminal() || position.depth_limit(sim_depth, settings.final_depth) {
            break;
        }
        let mv = if settings.blitz {
            position.random_move(rng)
        } else {
            line.legal_moves()?.choose(rng).cloned()
        };
        let Some(mv) = mv else {
            return Err(SearchError::NoLegalMoves {
                digest: position.digest(),
            });
        };
        line.make(&mv);
        sim_depth += 1;
    }

    let position = line.position();
    let reward = if position.is_terminal() {
        eval::terminal_reward(
            position.winner(),
            player,
            tree_depth + sim_depth,
            settings.win_loss_only,
        )
        .unwrap_or_else(|| position.normalized_score(player))
    } else {
        let score = position.normalized_score(player);
        if settings.win_loss_only {
            sign(score)
        } else {
            score
        }
    };
    Ok(if reward.is_nan() {
        0.0
    } else {
        reward.clamp(-1.0, 1.0)
    })
}

fn sign(score: f64) -> f64 {
    if score > 0.0 {
        1.0
    } else if score < 0.0 {
        -1.0
    } else {
        0.0
    }
}
