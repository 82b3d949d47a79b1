//! Bitboard TicTacToe for the t3 engine
//!
//! The board is two 9-bit occupancy masks, one per player, over cells
//! numbered 0..8 in row-major order. Public move APIs take 1-indexed
//! positions (1..9) to match what players type and what the oracle returns.
//!
//! # Usage
//!
//! ```rust
//! use games_tictactoe::{GameState, GameStateOptions, Terminal};
//!
//! let mut game = GameState::new(GameStateOptions::default()).unwrap();
//! assert!(game.play(5).unwrap()); // player 1 takes the center
//! assert_eq!(game.current_player(), 2);
//! assert_eq!(game.terminal(), Terminal::NotTerminal);
//!
//! let packed = game.to_bytes();
//! let restored = GameState::from_bytes(GameStateOptions::default(), &packed).unwrap();
//! assert_eq!(restored.board(), game.board());
//! ```

use std::fmt;
use thiserror::Error;

/// Mask with every cell set.
pub const BOARD_FULL: u16 = 0x01FF;

/// Number of cells (and of network output slots).
pub const NUM_CELLS: usize = 9;

/// Length of the network input encoding: 9 cells for each player.
pub const INPUT_SIZE: usize = 2 * NUM_CELLS;

/// Length of the packed wire format.
pub const PACKED_LEN: usize = 4;

/// Winning lines as bitmasks over cells 0..8.
pub const WIN_PATTERNS: [u16; 8] = [
    0x0007, 0x0038, 0x01C0, // rows
    0x0049, 0x0092, 0x0124, // columns
    0x0111, 0x0054, // diagonals
];

/// Errors for rejected moves. The board is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("Invalid player id: {0} (expected 1 or 2)")]
    InvalidPlayer(u8),

    #[error("Invalid position: {0} (expected 1-9)")]
    InvalidPosition(u8),

    #[error("Cell {0} is already occupied")]
    CellOccupied(u8),
}

/// Errors building a [`GameState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("Invalid piece symbol: {0:?}")]
    InvalidPiece(char),

    #[error("Player 1 and player 2 cannot use the same piece")]
    DuplicatePieces,

    #[error("Invalid first player id: {0}")]
    InvalidFirstPlayer(u8),

    #[error("Invalid board bytes: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors decoding the packed board format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Terminal classification of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Terminal {
    #[default]
    NotTerminal = 0,
    Win1 = 1,
    Win2 = 2,
    Draw = 3,
}

impl Terminal {
    pub fn is_over(self) -> bool {
        self != Terminal::NotTerminal
    }

    /// Winning player id, if any.
    pub fn winner(self) -> Option<u8> {
        match self {
            Terminal::Win1 => Some(1),
            Terminal::Win2 => Some(2),
            _ => None,
        }
    }
}

/// Two disjoint 9-bit occupancy masks.
///
/// `Board` is `Copy`; search code clones it per branch rather than sharing
/// a mutable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board {
    p1: u16,
    p2: u16,
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from raw masks, rejecting overlapping or out-of-range bits.
    pub fn from_masks(p1: u16, p2: u16) -> Result<Self, DecodeError> {
        if (p1 | p2) & !BOARD_FULL != 0 {
            return Err(DecodeError::CorruptedData(format!(
                "mask bits outside the board: p1={:#06x}, p2={:#06x}",
                p1, p2
            )));
        }
        if p1 & p2 != 0 {
            return Err(DecodeError::CorruptedData(format!(
                "overlapping masks: p1={:#06x}, p2={:#06x}",
                p1, p2
            )));
        }
        Ok(Self { p1, p2 })
    }

    pub fn p1_mask(&self) -> u16 {
        self.p1
    }

    pub fn p2_mask(&self) -> u16 {
        self.p2
    }

    pub fn occupied(&self) -> u16 {
        self.p1 | self.p2
    }

    /// Bit mask of empty cells.
    pub fn available_moves(&self) -> u16 {
        !self.occupied() & BOARD_FULL
    }

    /// Empty cells as 1-indexed positions in increasing order.
    pub fn legal_positions(&self) -> impl Iterator<Item = u8> {
        let free = self.available_moves();
        (0..NUM_CELLS as u8)
            .filter(move |bit| free & (1 << bit) != 0)
            .map(|bit| bit + 1)
    }

    /// Place `player`'s piece at 1-indexed `position`.
    pub fn play(&mut self, player: u8, position: u8) -> Result<(), MoveError> {
        if !(1..=2).contains(&player) {
            return Err(MoveError::InvalidPlayer(player));
        }
        if !(1..=NUM_CELLS as u8).contains(&position) {
            return Err(MoveError::InvalidPosition(position));
        }

        let bit = 1u16 << (position - 1);
        if self.occupied() & bit != 0 {
            return Err(MoveError::CellOccupied(position));
        }

        if player == 1 {
            self.p1 |= bit;
        } else {
            self.p2 |= bit;
        }
        Ok(())
    }

    /// Copy of this board with the move applied.
    pub fn with_move(&self, player: u8, position: u8) -> Result<Board, MoveError> {
        let mut next = *self;
        next.play(player, position)?;
        Ok(next)
    }

    /// Classify the board. Player 1's lines are checked first; valid play
    /// never produces two winners at once.
    pub fn terminal(&self) -> Terminal {
        if is_winner(self.p1) {
            Terminal::Win1
        } else if is_winner(self.p2) {
            Terminal::Win2
        } else if self.occupied() == BOARD_FULL {
            Terminal::Draw
        } else {
            Terminal::NotTerminal
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal().is_over()
    }

    /// Number of occupied cells.
    pub fn moves_played(&self) -> u32 {
        self.occupied().count_ones()
    }

    /// One-hot occupancy: indices 0..9 for player 1, 9..18 for player 2.
    /// Independent of whose turn it is.
    pub fn network_input(&self) -> [f64; INPUT_SIZE] {
        let mut input = [0.0; INPUT_SIZE];
        for cell in 0..NUM_CELLS {
            let bit = 1u16 << cell;
            if self.p1 & bit != 0 {
                input[cell] = 1.0;
            } else if self.p2 & bit != 0 {
                input[cell + NUM_CELLS] = 1.0;
            }
        }
        input
    }

    /// Pack as `[p1 hi, p1 lo, p2 hi, p2 lo]`.
    pub fn to_bytes(&self) -> [u8; PACKED_LEN] {
        pack_board(self.p1, self.p2)
    }

    /// Inverse of [`Board::to_bytes`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        let (p1, p2) = unpack_board(buf)?;
        Self::from_masks(p1, p2)
    }
}

/// True when `mask` covers any winning line.
pub fn is_winner(mask: u16) -> bool {
    WIN_PATTERNS
        .iter()
        .any(|&pattern| mask & pattern == pattern)
}

/// Encode two masks big-endian: `[p1 hi, p1 lo, p2 hi, p2 lo]`.
pub fn pack_board(p1: u16, p2: u16) -> [u8; PACKED_LEN] {
    let [p1_hi, p1_lo] = p1.to_be_bytes();
    let [p2_hi, p2_lo] = p2.to_be_bytes();
    [p1_hi, p1_lo, p2_hi, p2_lo]
}

/// Decode the 4-byte big-endian payload into `(p1, p2)` masks.
pub fn unpack_board(buf: &[u8]) -> Result<(u16, u16), DecodeError> {
    if buf.len() != PACKED_LEN {
        return Err(DecodeError::InvalidLength {
            expected: PACKED_LEN,
            actual: buf.len(),
        });
    }
    let p1 = u16::from_be_bytes([buf[0], buf[1]]);
    let p2 = u16::from_be_bytes([buf[2], buf[3]]);
    Ok((p1, p2))
}

/// Piece symbol shown for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    X,
    O,
}

impl Piece {
    pub fn symbol(self) -> char {
        match self {
            Piece::X => 'X',
            Piece::O => 'O',
        }
    }
}

impl TryFrom<char> for Piece {
    type Error = SetupError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'X' | 'x' => Ok(Piece::X),
            'O' | 'o' => Ok(Piece::O),
            other => Err(SetupError::InvalidPiece(other)),
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A seat at the table: id 1 or 2 plus the piece it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub id: u8,
    pub piece: Piece,
}

/// Options for [`GameState::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStateOptions {
    pub player1_piece: Piece,
    pub player2_piece: Piece,
    pub first_player: u8,
}

impl Default for GameStateOptions {
    fn default() -> Self {
        Self {
            player1_piece: Piece::X,
            player2_piece: Piece::O,
            first_player: 1,
        }
    }
}

impl GameStateOptions {
    /// Builder pattern: set which player id moves first.
    pub fn with_first_player(mut self, id: u8) -> Self {
        self.first_player = id;
        self
    }

    /// Builder pattern: set both pieces.
    pub fn with_pieces(mut self, player1: Piece, player2: Piece) -> Self {
        self.player1_piece = player1;
        self.player2_piece = player2;
        self
    }
}

/// A game in progress: board, seats, turn and terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    player1: Player,
    player2: Player,
    turn: u8,
    terminal: Terminal,
}

impl GameState {
    /// Start a new game on an empty board.
    pub fn new(options: GameStateOptions) -> Result<Self, SetupError> {
        if options.player1_piece == options.player2_piece {
            return Err(SetupError::DuplicatePieces);
        }
        if !(1..=2).contains(&options.first_player) {
            return Err(SetupError::InvalidFirstPlayer(options.first_player));
        }

        Ok(Self {
            board: Board::new(),
            player1: Player {
                id: 1,
                piece: options.player1_piece,
            },
            player2: Player {
                id: 2,
                piece: options.player2_piece,
            },
            turn: options.first_player,
            terminal: Terminal::NotTerminal,
        })
    }

    /// Restore a game from its packed board. `first_player` in the options is
    /// the player to move next.
    pub fn from_bytes(options: GameStateOptions, buf: &[u8]) -> Result<Self, SetupError> {
        let mut state = Self::new(options)?;
        state.board = Board::from_bytes(buf)?;
        state.terminal = state.board.terminal();
        Ok(state)
    }

    /// Play the current player's piece at 1-indexed `position`.
    ///
    /// Returns `Ok(true)` if the move was accepted and the turn passed.
    /// Returns `Ok(false)` without touching the game when it is already over
    /// or the cell is taken. Malformed positions are errors.
    pub fn play(&mut self, position: u8) -> Result<bool, MoveError> {
        if self.is_terminal() {
            return Ok(false);
        }

        match self.board.play(self.turn, position) {
            Ok(()) => {}
            Err(MoveError::CellOccupied(_)) => return Ok(false),
            Err(e) => return Err(e),
        }

        self.turn = if self.turn == self.player1.id {
            self.player2.id
        } else {
            self.player1.id
        };
        self.terminal = self.board.terminal();

        Ok(true)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> u8 {
        self.turn
    }

    pub fn player1(&self) -> Player {
        self.player1
    }

    pub fn player2(&self) -> Player {
        self.player2
    }

    pub fn terminal(&self) -> Terminal {
        self.terminal
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_over()
    }

    pub fn network_input(&self) -> [f64; INPUT_SIZE] {
        self.board.network_input()
    }

    pub fn to_bytes(&self) -> [u8; PACKED_LEN] {
        self.board.to_bytes()
    }

    /// Row-major cells as piece symbols, `_` for empty.
    pub fn render(&self) -> String {
        (0..NUM_CELLS)
            .map(|cell| {
                let bit = 1u16 << cell;
                if self.board.p1 & bit != 0 {
                    self.player1.piece.symbol()
                } else if self.board.p2 & bit != 0 {
                    self.player2.piece.symbol()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<char> = self.render().chars().collect();
        for row in cells.chunks(3) {
            writeln!(f, "{}", row.iter().collect::<String>())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
