use super::*;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn board_from_moves(moves: &[(u8, u8)]) -> Board {
    let mut board = Board::new();
    for &(player, position) in moves {
        board.play(player, position).unwrap();
    }
    board
}

#[test]
fn test_empty_board() {
    let board = Board::new();
    assert_eq!(board.p1_mask(), 0);
    assert_eq!(board.p2_mask(), 0);
    assert_eq!(board.available_moves(), BOARD_FULL);
    assert_eq!(board.terminal(), Terminal::NotTerminal);
    assert_eq!(board.legal_positions().collect::<Vec<_>>(), (1..=9).collect::<Vec<_>>());
}

#[test]
fn test_play_sets_bits() {
    let mut board = Board::new();
    board.play(1, 5).unwrap();
    board.play(2, 1).unwrap();

    assert_eq!(board.p1_mask(), 0x010);
    assert_eq!(board.p2_mask(), 0x001);
    assert_eq!(board.available_moves(), BOARD_FULL & !0x011);
    assert_eq!(board.moves_played(), 2);
}

#[test]
fn test_play_rejects_bad_input() {
    let mut board = Board::new();
    assert_eq!(board.play(0, 1), Err(MoveError::InvalidPlayer(0)));
    assert_eq!(board.play(3, 1), Err(MoveError::InvalidPlayer(3)));
    assert_eq!(board.play(1, 0), Err(MoveError::InvalidPosition(0)));
    assert_eq!(board.play(1, 10), Err(MoveError::InvalidPosition(10)));

    board.play(1, 4).unwrap();
    let before = board;
    assert_eq!(board.play(2, 4), Err(MoveError::CellOccupied(4)));
    assert_eq!(board, before);
}

#[test]
fn test_every_pattern_wins() {
    for &pattern in &WIN_PATTERNS {
        let p1 = Board::from_masks(pattern, 0).unwrap();
        assert_eq!(p1.terminal(), Terminal::Win1, "pattern {:#05x}", pattern);

        let p2 = Board::from_masks(0, pattern).unwrap();
        assert_eq!(p2.terminal(), Terminal::Win2, "pattern {:#05x}", pattern);
    }
}

#[test]
fn test_draw() {
    // X O X
    // X O O
    // O X X
    let board = Board::from_masks(0b110_001_101, 0b001_110_010).unwrap();
    assert_eq!(board.occupied(), BOARD_FULL);
    assert_eq!(board.terminal(), Terminal::Draw);
    assert_eq!(board.available_moves(), 0);
}

#[test]
fn test_win_on_last_cell_is_not_draw() {
    // X X X
    // O O X
    // X O O
    let board = Board::from_masks(0b001_100_111, 0b110_011_000).unwrap();
    assert_eq!(board.occupied(), BOARD_FULL);
    assert_eq!(board.terminal(), Terminal::Win1);
}

#[test]
fn test_from_masks_validation() {
    assert!(matches!(
        Board::from_masks(0x200, 0),
        Err(DecodeError::CorruptedData(_))
    ));
    assert!(matches!(
        Board::from_masks(0x011, 0x010),
        Err(DecodeError::CorruptedData(_))
    ));
}

#[test]
fn test_pack_layout() {
    assert_eq!(pack_board(0x0100, 0x0001), [0x01, 0x00, 0x00, 0x01]);
    assert_eq!(pack_board(0x01FF, 0x0000), [0x01, 0xFF, 0x00, 0x00]);
    assert_eq!(unpack_board(&[0x00, 0x54, 0x01, 0x02]).unwrap(), (0x0054, 0x0102));
}

#[test]
fn test_unpack_wrong_length() {
    assert_eq!(
        unpack_board(&[0, 1, 2]),
        Err(DecodeError::InvalidLength {
            expected: 4,
            actual: 3
        })
    );
    assert!(Board::from_bytes(&[0; 5]).is_err());
}

#[test]
fn test_network_input_encoding() {
    let board = board_from_moves(&[(1, 1), (2, 5), (1, 9)]);
    let input = board.network_input();

    assert_eq!(input[0], 1.0);
    assert_eq!(input[8], 1.0);
    assert_eq!(input[9 + 4], 1.0);
    assert_eq!(input.iter().sum::<f64>(), 3.0);
}

#[test]
fn test_game_state_alternates() {
    let mut game = GameState::new(GameStateOptions::default()).unwrap();
    assert_eq!(game.current_player(), 1);
    assert!(game.play(5).unwrap());
    assert_eq!(game.current_player(), 2);
    assert!(game.play(1).unwrap());
    assert_eq!(game.current_player(), 1);
    assert_eq!(game.board().p1_mask(), 0x010);
    assert_eq!(game.board().p2_mask(), 0x001);
}

#[test]
fn test_game_state_first_player_two() {
    let options = GameStateOptions::default().with_first_player(2);
    let mut game = GameState::new(options).unwrap();
    assert_eq!(game.current_player(), 2);
    assert!(game.play(3).unwrap());
    assert_eq!(game.board().p2_mask(), 0x004);
    assert_eq!(game.current_player(), 1);
}

#[test]
fn test_game_state_occupied_cell_returns_false() {
    let mut game = GameState::new(GameStateOptions::default()).unwrap();
    assert!(game.play(5).unwrap());
    let before = game.clone();

    assert!(!game.play(5).unwrap());
    assert_eq!(game, before);
    assert!(game.play(10).is_err());
    assert_eq!(game, before);
}

#[test]
fn test_game_state_rejects_moves_after_win() {
    let mut game = GameState::new(GameStateOptions::default()).unwrap();
    for position in [1, 4, 2, 5, 3] {
        assert!(game.play(position).unwrap());
    }
    assert_eq!(game.terminal(), Terminal::Win1);
    assert_eq!(game.terminal().winner(), Some(1));
    assert!(game.is_terminal());

    let before = game.clone();
    assert!(!game.play(9).unwrap());
    assert_eq!(game, before);
}

#[test]
fn test_setup_errors() {
    let same = GameStateOptions::default().with_pieces(Piece::X, Piece::X);
    assert_eq!(GameState::new(same), Err(SetupError::DuplicatePieces));

    let bad_first = GameStateOptions::default().with_first_player(3);
    assert_eq!(GameState::new(bad_first), Err(SetupError::InvalidFirstPlayer(3)));

    assert_eq!(Piece::try_from('o'), Ok(Piece::O));
    assert_eq!(Piece::try_from('#'), Err(SetupError::InvalidPiece('#')));
}

#[test]
fn test_from_bytes_recomputes_terminal() {
    let options = GameStateOptions::default();
    let game = GameState::from_bytes(options, &pack_board(0x0007, 0x0018)).unwrap();
    assert_eq!(game.terminal(), Terminal::Win1);

    let overlapping = GameState::from_bytes(options, &pack_board(0x0001, 0x0001));
    assert!(matches!(overlapping, Err(SetupError::Decode(_))));
}

#[test]
fn test_render_and_display() {
    let options = GameStateOptions::default().with_pieces(Piece::O, Piece::X);
    let mut game = GameState::new(options).unwrap();
    game.play(1).unwrap();
    game.play(5).unwrap();

    assert_eq!(game.render(), "O___X____");
    assert_eq!(game.to_string(), "O__\n_X_\n___\n");
}

#[test]
fn test_random_games_stay_consistent() {
    let mut rng = ChaCha20Rng::seed_from_u64(42);

    for _ in 0..200 {
        let mut game = GameState::new(GameStateOptions::default()).unwrap();
        while !game.is_terminal() {
            let position = game.board().legal_positions().choose(&mut rng).unwrap();
            assert!(game.play(position).unwrap());

            let board = game.board();
            assert_eq!(board.p1_mask() & board.p2_mask(), 0);
            assert_eq!(board.occupied() & !BOARD_FULL, 0);
            assert_eq!(Board::from_bytes(&board.to_bytes()).unwrap(), *board);
        }
        assert!(game.board().moves_played() >= 5);
    }
}
