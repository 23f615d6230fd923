use crate::engine::adapter::GameAdapter;
use crate::engine::budget::SearchBudget;
use crate::engine::config::SearchConfig;
use crate::engine::eval::{is_loss_score, is_win_score, win_score};
use crate::engine::mcts::MonteCarloEngine;
use crate::engine::search::AlphaBetaEngine;
use crate::engine::Searcher;
use crate::logic::game_tree::GameTree;
use crate::logic::tictactoe::TicTacToe;
use std::sync::Arc;

fn depth_config(depth: usize) -> Arc<SearchConfig> {
    Arc::new(SearchConfig {
        time_per_move_ms: None,
        max_depth: depth,
        verify_digests: true,
        ..SearchConfig::default()
    })
}

#[test]
fn test_win_in_one() {
    // x to move, completes the top row at cell 2.
    let game = TicTacToe::from_board("xx.oo....");
    let mut engine = AlphaBetaEngine::new(depth_config(4));
    let outcome = engine.search(&game, &SearchBudget::unlimited()).unwrap();
    assert_eq!(outcome.best_move, Some(2));
    assert!((outcome.score - win_score(1)).abs() < 1e-9);
}

#[test]
fn test_block_the_threat() {
    // o to move must block at cell 2 or lose next turn.
    let game = TicTacToe::from_board("xx.o.....");
    assert_eq!(game.to_move(), 1);
    let mut engine = AlphaBetaEngine::new(depth_config(2));
    let outcome = engine.search(&game, &SearchBudget::unlimited()).unwrap();
    assert_eq!(outcome.best_move, Some(2));
    assert!(!is_loss_score(outcome.score));
}

#[test]
fn test_faster_win_preferred() {
    // Move 1 wins on the spot, move 2 wins two plies later.
    let tree = GameTree::builder()
        .node(0, &[1, 2])
        .winner(1, 0)
        .node(2, &[3])
        .node(3, &[4])
        .winner(4, 0)
        .build();
    let mut engine = AlphaBetaEngine::new(depth_config(6));
    let outcome = engine.search(&tree, &SearchBudget::unlimited()).unwrap();
    assert_eq!(outcome.best_move, Some(1));
    assert!(is_win_score(outcome.score));
    assert!(outcome.score > win_score(3));
}

#[test]
fn test_slower_loss_preferred() {
    // Every move loses; 2 holds out longer than 1.
    let tree = GameTree::builder()
        .node(0, &[1, 2])
        .winner(1, 1)
        .node(2, &[3])
        .node(3, &[4])
        .winner(4, 1)
        .build();
    let mut engine = AlphaBetaEngine::new(depth_config(6));
    let outcome = engine.search(&tree, &SearchBudget::unlimited()).unwrap();
    assert_eq!(outcome.best_move, Some(2));
    assert!(is_loss_score(outcome.score));
}

#[test]
fn test_uct_takes_the_immediate_win() {
    let game = TicTacToe::from_board("xx.oo....");
    let config = Arc::new(SearchConfig {
        time_per_move_ms: None,
        max_simulations: Some(400),
        seed: Some(9),
        ..SearchConfig::default()
    });
    let mut engine = MonteCarloEngine::new(config);
    let outcome = engine.search(&game, &SearchBudget::unlimited()).unwrap();
    assert_eq!(outcome.best_move, Some(2));
    assert!(outcome.score > 0.0);
}
