//! Exact minimax search with alpha-beta pruning for TicTacToe.
//!
//! Roles are fixed: player 2 is the maximizer and player 1 the minimizer.
//! Terminal boards score `+1` for a player 2 win, `-1` for a player 1 win
//! and `0` for a draw. The game tree is at most 9 plies deep, so the search
//! always runs to terminal boards without a depth limit.
//!
//! Candidate moves are enumerated in increasing cell order and the root only
//! replaces its best move on a strictly greater value, so among equally good
//! moves the lowest position is returned. Training labels depend on this.
//!
//! # Usage
//!
//! ```rust
//! use games_tictactoe::Board;
//!
//! let board = Board::new();
//! assert_eq!(minimax::best_move(&board), 1);
//!
//! let result = minimax::search(&board);
//! assert_eq!(result.value, 0);
//! assert!(result.nodes > 0);
//! ```

use games_tictactoe::{Board, Terminal, NUM_CELLS};
use tracing::trace;

/// Player id that maximizes the score.
pub const MAX_PLAYER: u8 = 2;

/// Player id that minimizes the score.
pub const MIN_PLAYER: u8 = 1;

/// Result of a root search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Best 1-indexed position for player 2, or 0 if the board is terminal
    pub position: u8,

    /// Minimax value of the best move (or of the terminal board itself)
    pub value: i32,

    /// Exact value of each legal root move, indexed by cell (position - 1)
    pub move_values: [Option<i32>; NUM_CELLS],

    /// Number of boards visited, root children included
    pub nodes: u64,
}

impl SearchResult {
    /// Legal root positions sharing the best value, in increasing order.
    pub fn best_positions(&self) -> Vec<u8> {
        if self.position == 0 {
            return Vec::new();
        }
        self.move_values
            .iter()
            .enumerate()
            .filter(|(_, value)| **value == Some(self.value))
            .map(|(cell, _)| cell as u8 + 1)
            .collect()
    }
}

/// Score of a terminal board from player 2's point of view.
pub fn score(terminal: Terminal) -> Option<i32> {
    match terminal {
        Terminal::Win1 => Some(-1),
        Terminal::Win2 => Some(1),
        Terminal::Draw => Some(0),
        Terminal::NotTerminal => None,
    }
}

/// Best 1-indexed position for player 2 to play, or 0 if the board is terminal.
pub fn best_move(board: &Board) -> u8 {
    search(board).position
}

/// Search every legal player 2 move on `board` with a full window.
pub fn search(board: &Board) -> SearchResult {
    let mut searcher = Searcher { nodes: 0 };

    if let Some(value) = score(board.terminal()) {
        return SearchResult {
            position: 0,
            value,
            move_values: [None; NUM_CELLS],
            nodes: 0,
        };
    }

    let mut move_values = [None; NUM_CELLS];
    let mut best_value = i32::MIN;
    let mut best_position = 0u8;

    for (position, child) in children(board, MAX_PLAYER) {
        let value = searcher.alphabeta(&child, i32::MIN, i32::MAX, false);
        move_values[position as usize - 1] = Some(value);
        if value > best_value {
            best_value = value;
            best_position = position;
        }
    }

    trace!(
        position = best_position,
        value = best_value,
        nodes = searcher.nodes,
        "Minimax search complete"
    );

    SearchResult {
        position: best_position,
        value: best_value,
        move_values,
        nodes: searcher.nodes,
    }
}

struct Searcher {
    nodes: u64,
}

impl Searcher {
    fn alphabeta(&mut self, board: &Board, mut alpha: i32, mut beta: i32, maximizing: bool) -> i32 {
        self.nodes += 1;

        if let Some(value) = score(board.terminal()) {
            return value;
        }

        if maximizing {
            let mut value = i32::MIN;
            for (_, child) in children(board, MAX_PLAYER) {
                value = value.max(self.alphabeta(&child, alpha, beta, false));
                if value >= beta {
                    break;
                }
                alpha = alpha.max(value);
            }
            value
        } else {
            let mut value = i32::MAX;
            for (_, child) in children(board, MIN_PLAYER) {
                value = value.min(self.alphabeta(&child, alpha, beta, true));
                if value <= alpha {
                    break;
                }
                beta = beta.min(value);
            }
            value
        }
    }
}

/// Boards reachable by one `player` move, paired with the position played,
/// in increasing position order. Each child is an independent copy.
fn children(board: &Board, player: u8) -> impl Iterator<Item = (u8, Board)> + '_ {
    board
        .legal_positions()
        .filter_map(move |position| {
            board
                .with_move(player, position)
                .ok()
                .map(|child| (position, child))
        })
}
