use crate::engine::adapter::{GameAdapter, Player};
use crate::engine::eval::WIN;
use crate::engine::zobrist::ZobristKeys;
use std::sync::OnceLock;

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

fn keys() -> &'static ZobristKeys {
    static KEYS: OnceLock<ZobristKeys> = OnceLock::new();
    KEYS.get_or_init(|| ZobristKeys::new(18, 2, 0x7431_C7AC_70E0_0001))
}

/// Cell index 0..9, row-major.
pub type Cell = usize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicTacToe {
    cells: [Option<Player>; 9],
    to_move: Player,
    moves_played: usize,
    hash: u64,
}

impl TicTacToe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hash: keys().side_key(0),
            ..Self::default()
        }
    }

    /// Build a position from a 9-character board, `x` for player 0, `o` for
    /// player 1 and anything else for empty. Player 0 moves when the counts
    /// are equal.
    #[must_use]
    pub fn from_board(board: &str) -> Self {
        let mut game = Self::new();
        let mut cells = [None; 9];
        for (cell, ch) in cells.iter_mut().zip(board.chars()) {
            *cell = match ch {
                'x' | 'X' => Some(0),
                'o' | 'O' => Some(1),
                _ => None,
            };
        }
        let xs = cells.iter().filter(|c| **c == Some(0)).count();
        let os = cells.iter().filter(|c| **c == Some(1)).count();
        game.to_move = usize::from(xs > os);
        game.moves_played = xs + os;
        game.cells = cells;
        game.hash = game.full_hash();
        game
    }

    #[must_use]
    pub fn cell(&self, cell: Cell) -> Option<Player> {
        self.cells.get(cell).copied().flatten()
    }

    fn full_hash(&self) -> u64 {
        let mut hash = keys().side_key(self.to_move);
        for (cell, owner) in self.cells.iter().enumerate() {
            if let Some(p) = owner {
                hash ^= keys().key(cell * 2 + p);
            }
        }
        hash
    }

    fn line_owner(&self, line: &[usize; 3]) -> Option<Player> {
        let [a, b, c] = line.map(|i| self.cell(i));
        match (a, b, c) {
            (Some(x), Some(y), Some(z)) if x == y && y == z => Some(x),
            _ => None,
        }
    }
}

impl GameAdapter for TicTacToe {
    type Move = Cell;
    type Undo = ();

    fn legal_moves(&self) -> Vec<Cell> {
        if self.winner().is_some() {
            return Vec::new();
        }
        (0..9).filter(|&i| self.cell(i).is_none()).collect()
    }

    fn make(&mut self, mv: &Cell) {
        if let Some(slot) = self.cells.get_mut(*mv) {
            *slot = Some(self.to_move);
            self.hash ^= keys().key(mv * 2 + self.to_move);
        }
        self.hash ^= keys().side_key(self.to_move) ^ keys().side_key(self.to_move ^ 1);
        self.to_move ^= 1;
        self.moves_played += 1;
    }

    fn unmake(&mut self, mv: &Cell, (): ()) {
        self.hash ^= keys().side_key(self.to_move) ^ keys().side_key(self.to_move ^ 1);
        self.to_move ^= 1;
        self.moves_played -= 1;
        if let Some(slot) = self.cells.get_mut(*mv) {
            *slot = None;
            self.hash ^= keys().key(mv * 2 + self.to_move);
        }
    }

    /// Open lines weighted by how many marks they hold.
    fn evaluate(&self, player: Player) -> f64 {
        if let Some(w) = self.winner() {
            return if w == player { WIN } else { -WIN };
        }
        let mut score = 0.0;
        for line in &LINES {
            let mine = line.iter().filter(|&&i| self.cell(i) == Some(player)).count();
            let theirs = line
                .iter()
                .filter(|&&i| self.cell(i).is_some_and(|p| p != player))
                .count();
            match (mine, theirs) {
                (0, 0) => {}
                (m, 0) => score += (m * m) as f64,
                (0, t) => score -= (t * t) as f64,
                _ => {}
            }
        }
        score
    }

    fn digest(&self) -> u64 {
        self.hash
    }

    fn is_terminal(&self) -> bool {
        self.winner().is_some() || self.cells.iter().all(Option::is_some)
    }

    fn winner(&self) -> Option<Player> {
        LINES.iter().find_map(|line| self.line_owner(line))
    }

    fn to_move(&self) -> Player {
        self.to_move
    }

    fn move_number(&self) -> usize {
        self.moves_played + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_rows_columns_and_diagonals() {
        assert_eq!(TicTacToe::from_board("xxxoo....").winner(), Some(0));
        assert_eq!(TicTacToe::from_board("ox.ox.o.x").winner(), Some(1));
        assert_eq!(TicTacToe::from_board("x.o.xo..x").winner(), Some(0));
        assert_eq!(TicTacToe::from_board("xoxxoooxx").winner(), None);
        assert!(TicTacToe::from_board("xoxxoooxx").is_terminal());
    }

    #[test]
    fn incremental_hash_matches_full_hash() {
        let mut game = TicTacToe::new();
        for mv in [4, 0, 8, 2] {
            game.make(&mv);
            assert_eq!(game.digest(), game.full_hash());
        }
        let same = TicTacToe::from_board("o.o.x...x");
        assert_eq!(game.digest(), same.digest());
        game.unmake(&2, ());
        game.unmake(&8, ());
        assert_eq!(game.digest(), game.full_hash());
        assert_eq!(game.move_number(), 3);
    }

    #[test]
    fn evaluation_favours_open_lines() {
        let game = TicTacToe::from_board("....x....");
        assert!(game.evaluate(0) > 0.0);
        assert!(game.evaluate(1) < 0.0);
        assert!(TicTacToe::new().evaluate(0).abs() < f64::EPSILON);
    }
}
