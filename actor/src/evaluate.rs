//! Network vs random-opponent evaluation games

use anyhow::{anyhow, Result};
use games_tictactoe::{GameState, GameStateOptions, Terminal};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::policy::{NetworkPolicy, Policy};

/// Seat the network plays. The oracle scores positions for this player.
pub const NETWORK_PLAYER: u8 = 2;

/// Aggregate results over a set of games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub games: u32,
    pub network_wins: u32,
    pub opponent_wins: u32,
    pub draws: u32,
    /// Moves the network made across all games
    pub network_moves: u32,
    /// Network moves identical to the oracle's pick
    pub oracle_matches: u32,
    /// Network moves with the same minimax value as the oracle's pick
    pub optimal_moves: u32,
}

impl EvaluationSummary {
    fn record(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        match outcome.terminal {
            Terminal::Win1 => self.opponent_wins += 1,
            Terminal::Win2 => self.network_wins += 1,
            _ => self.draws += 1,
        }
        self.network_moves += outcome.network_moves;
        self.oracle_matches += outcome.oracle_matches;
        self.optimal_moves += outcome.optimal_moves;
    }

    /// Fraction of network moves matching the oracle exactly.
    pub fn agreement(&self) -> f64 {
        if self.network_moves == 0 {
            0.0
        } else {
            self.oracle_matches as f64 / self.network_moves as f64
        }
    }

    /// Fraction of network moves that were minimax-optimal.
    pub fn optimal_rate(&self) -> f64 {
        if self.network_moves == 0 {
            0.0
        } else {
            self.optimal_moves as f64 / self.network_moves as f64
        }
    }
}

/// Result of one game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub terminal: Terminal,
    pub network_moves: u32,
    pub oracle_matches: u32,
    pub optimal_moves: u32,
}

/// Play one game to the end. `first_player` chooses who opens.
pub fn play_game(
    network: &mut NetworkPolicy,
    opponent: &mut dyn Policy,
    first_player: u8,
) -> Result<GameOutcome> {
    let mut game = GameState::new(GameStateOptions::default().with_first_player(first_player))?;
    let mut outcome = GameOutcome {
        terminal: Terminal::NotTerminal,
        network_moves: 0,
        oracle_matches: 0,
        optimal_moves: 0,
    };

    while !game.is_terminal() {
        let position = if game.current_player() == NETWORK_PLAYER {
            let position = network.select_move(&game)?;
            let oracle = minimax::search(game.board());
            outcome.network_moves += 1;
            if position == oracle.position {
                outcome.oracle_matches += 1;
            }
            if oracle.move_values[position as usize - 1] == Some(oracle.value) {
                outcome.optimal_moves += 1;
            }
            position
        } else {
            opponent.select_move(&game)?
        };

        if !game.play(position)? {
            return Err(anyhow!("Move {} was rejected on board {}", position, game.render()));
        }
    }

    outcome.terminal = game.terminal();
    debug!(
        board = %game.render(),
        terminal = ?outcome.terminal,
        network_moves = outcome.network_moves,
        "Evaluation game finished"
    );
    Ok(outcome)
}

/// Play `games` games, alternating who opens. Stops early if `cancel` is set.
pub fn evaluate<F>(
    network: &mut NetworkPolicy,
    opponent: &mut dyn Policy,
    games: u32,
    cancel: &AtomicBool,
    mut on_game: F,
) -> Result<EvaluationSummary>
where
    F: FnMut(&GameOutcome),
{
    let mut summary = EvaluationSummary::default();
    for i in 0..games {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let first_player = if i % 2 == 0 { 1 } else { 2 };
        let outcome = play_game(network, opponent, first_player)?;
        summary.record(&outcome);
        on_game(&outcome);
    }
    Ok(summary)
}
