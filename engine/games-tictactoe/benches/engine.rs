use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use games_tictactoe::{pack_board, unpack_board, Board};

fn midgame_board() -> Board {
    let mut board = Board::new();
    for (player, position) in [(1, 5), (2, 1), (1, 9), (2, 3)] {
        board.play(player, position).unwrap();
    }
    board
}

fn bench_play(c: &mut Criterion) {
    let mut group = c.benchmark_group("board_play");
    group.bench_function("play_center", |b| {
        b.iter_batched(
            Board::new,
            |mut board| {
                let _ = board.play(1, 5);
                board
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_terminal(c: &mut Criterion) {
    let mut group = c.benchmark_group("board_terminal");
    let board = midgame_board();
    group.bench_function("terminal_midgame", |b| {
        b.iter(|| black_box(board).terminal());
    });
    group.bench_function("network_input", |b| {
        b.iter(|| black_box(board).network_input());
    });
    group.finish();
}

fn bench_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("board_packing");
    let board = midgame_board();
    group.bench_function("pack_unpack", |b| {
        b.iter(|| {
            let bytes = pack_board(black_box(board.p1_mask()), black_box(board.p2_mask()));
            unpack_board(&bytes).unwrap()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_play, bench_terminal, bench_packing);
criterion_main!(benches);
