mod common;

use common::{minimax, Flat};
use robot_core::engine::budget::SearchBudget;
use robot_core::engine::config::SearchConfig;
use robot_core::engine::search::AlphaBetaEngine;
use robot_core::engine::{GameAdapter, Searcher};
use robot_core::logic::game_tree::GameTree;
use robot_core::logic::tictactoe::TicTacToe;
use std::sync::Arc;

fn fixed_depth(depth: usize, killers: bool) -> Arc<SearchConfig> {
    Arc::new(SearchConfig {
        time_per_move_ms: None,
        max_depth: depth,
        killer_moves: killers,
        verify_digests: true,
        ..SearchConfig::default()
    })
}

fn assert_matches_oracle<G: GameAdapter>(position: &G, depth: usize, killers: bool) {
    let root = position.to_move();
    let expected = minimax(&mut position.clone(), root, 0, depth);
    let mut engine = AlphaBetaEngine::new(fixed_depth(depth, killers));
    let outcome = engine
        .search(position, &SearchBudget::unlimited())
        .expect("search failed");
    assert!(
        (outcome.score - expected).abs() < 1e-9,
        "score {} != minimax {expected}",
        outcome.score
    );

    // The chosen move really achieves the value.
    let best = outcome.best_move.expect("no move");
    let mut after = position.clone();
    let undo = after.make(&best);
    let achieved = minimax(&mut after, root, 1, depth);
    after.unmake(&best, undo);
    assert!((achieved - expected).abs() < 1e-9);
    assert_eq!(outcome.principal_variation.first(), Some(&best));
}

#[test]
fn random_trees_match_minimax() {
    for seed in 0..25 {
        let tree = GameTree::random(seed, 5, 3);
        assert_matches_oracle(&tree, 5, true);
    }
}

#[test]
fn depth_limited_trees_match_minimax() {
    for seed in 100..115 {
        let tree = GameTree::random(seed, 6, 3);
        assert_matches_oracle(&tree, 3, true);
        assert_matches_oracle(&tree, 4, false);
    }
}

#[test]
fn tictactoe_positions_match_minimax() {
    for board in ["x...o....", "xo..x....", ".........", "x.o.o.x..", "oxx.xo..."] {
        let game = TicTacToe::from_board(board);
        assert_matches_oracle(&game, 4, true);
        assert_matches_oracle(&game, 4, false);
    }
}

#[test]
fn killers_do_not_change_the_result() {
    let game = TicTacToe::from_board("x........");
    let budget = SearchBudget::unlimited();
    let with = AlphaBetaEngine::new(fixed_depth(6, true))
        .search(&game, &budget)
        .unwrap();
    let without = AlphaBetaEngine::new(fixed_depth(6, false))
        .search(&game, &budget)
        .unwrap();
    assert!((with.score - without.score).abs() < 1e-9);
    assert_eq!(with.best_move, without.best_move);
    assert!(with.stats.killer_cutoffs > 0);
}

#[test]
fn equal_moves_resolve_to_the_first() {
    let flat = Flat::new(10, 5, 0.0);
    let mut engine = AlphaBetaEngine::new(fixed_depth(2, true));
    let outcome = engine.search(&flat, &SearchBudget::unlimited()).unwrap();
    assert_eq!(outcome.best_move, Some(0));
    assert_eq!(outcome.root_children.len(), 5);
}

#[test]
fn iterative_deepening_reports_completed_depth() {
    let tree = GameTree::random(7, 6, 3);
    let config = Arc::new(SearchConfig {
        time_per_move_ms: Some(5_000),
        max_depth: 6,
        ..SearchConfig::default()
    });
    let mut engine = AlphaBetaEngine::new(config);
    let budget = SearchBudget::new(
        Some(std::time::Duration::from_secs(5)),
        robot_core::engine::CancelToken::new(),
    );
    let outcome = engine.search(&tree, &budget).unwrap();
    assert_eq!(outcome.stats.depth, 6);
    assert!((outcome.score - tree.minimax(6)).abs() < 1e-9);
}

/// Both root moves are worth 5 at depth 2, but the second one looks better
/// at depth 1 and is searched first on the final iteration.
fn tied_after_reordering() -> GameTree {
    GameTree::builder()
        .node(0, &[1, 2])
        .node(1, &[3, 4])
        .node(2, &[5, 6])
        .leaf(3, 5.0)
        .leaf(4, 5.0)
        .leaf(5, 5.0)
        .leaf(6, 9.0)
        .build()
}

#[test]
fn iterative_deepening_keeps_the_first_of_equal_moves() {
    let tree = tied_after_reordering();
    let fixed = AlphaBetaEngine::new(fixed_depth(2, true))
        .search(&tree, &SearchBudget::unlimited())
        .unwrap();

    let config = Arc::new(SearchConfig {
        max_depth: 2,
        ..SearchConfig::default()
    });
    let budget = SearchBudget::with_time_limit(std::time::Duration::from_secs(5));
    let timed = AlphaBetaEngine::new(config).search(&tree, &budget).unwrap();

    assert_eq!(timed.stats.depth, 2);
    assert_eq!(fixed.best_move, Some(1));
    assert_eq!(timed.best_move, fixed.best_move);
    assert!((timed.score - 5.0).abs() < 1e-9);
    // Root children come back in the adapter's order.
    let listed: Vec<_> = timed.root_children.iter().map(|c| c.mv).collect();
    assert_eq!(listed, vec![1, 2]);
}

#[test]
fn static_sort_does_not_change_the_result() {
    let sorted = Arc::new(SearchConfig {
        time_per_move_ms: None,
        max_depth: 5,
        static_sort: true,
        verify_digests: true,
        ..SearchConfig::default()
    });
    for seed in 200..215 {
        let tree = GameTree::random(seed, 5, 3);
        let budget = SearchBudget::unlimited();
        let plain = AlphaBetaEngine::new(fixed_depth(5, true))
            .search(&tree, &budget)
            .unwrap();
        let ordered = AlphaBetaEngine::new(sorted.clone())
            .search(&tree, &budget)
            .unwrap();
        assert!((plain.score - ordered.score).abs() < 1e-9, "seed {seed}");
        assert_eq!(plain.best_move, ordered.best_move, "seed {seed}");
    }
}

#[test]
fn single_move_is_played_without_searching() {
    let tree = GameTree::builder()
        .node(0, &[1])
        .node(1, &[2, 3])
        .leaf(2, -4.0)
        .leaf(3, 6.0)
        .build();
    let budget = SearchBudget::unlimited();

    let outcome = AlphaBetaEngine::new(fixed_depth(4, true))
        .search(&tree, &budget)
        .unwrap();
    assert_eq!(outcome.best_move, Some(1));
    assert_eq!(outcome.stats.depth, 0);
    assert_eq!(outcome.stats.nodes, 0);

    let config = Arc::new(SearchConfig {
        time_per_move_ms: None,
        max_depth: 4,
        single_choice_optimization: false,
        ..SearchConfig::default()
    });
    let searched = AlphaBetaEngine::new(config).search(&tree, &budget).unwrap();
    assert_eq!(searched.best_move, Some(1));
    assert_eq!(searched.stats.depth, 4);
    assert!(searched.stats.nodes > 0);
    // Player 1 answers with the leaf worth -4.
    assert!((searched.score + 4.0).abs() < 1e-9);
}

#[test]
fn good_enough_score_stops_the_search() {
    let tree = GameTree::builder()
        .node(0, &[1, 2, 3])
        .leaf(1, 10.0)
        .leaf(2, 50.0)
        .leaf(3, 90.0)
        .build();
    let budget = SearchBudget::unlimited();

    let config = Arc::new(SearchConfig {
        time_per_move_ms: None,
        max_depth: 3,
        good_enough_score: Some(20.0),
        ..SearchConfig::default()
    });
    let quick = AlphaBetaEngine::new(config).search(&tree, &budget).unwrap();
    assert_eq!(quick.best_move, Some(2));
    assert_eq!(quick.stats.good_enough_cutoffs, 1);
    assert_eq!(quick.root_children.len(), 2);

    let full = AlphaBetaEngine::new(fixed_depth(3, true))
        .search(&tree, &budget)
        .unwrap();
    assert_eq!(full.best_move, Some(3));
    assert_eq!(full.stats.good_enough_cutoffs, 0);
}
