//! Small reference games used by the tests, the benchmarks and the arena.

pub mod game_tree;
pub mod nim;
pub mod tictactoe;
