//! Move selection policies for evaluation games

use anyhow::{anyhow, Result};
use ffnn::{rank_positions, Network};
use games_tictactoe::GameState;
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;

/// Picks a 1-indexed position for the player to move.
pub trait Policy {
    fn select_move(&mut self, game: &GameState) -> Result<u8>;
}

/// Uniformly random legal moves.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    pub fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn select_move(&mut self, game: &GameState) -> Result<u8> {
        game.board()
            .legal_positions()
            .choose(&mut self.rng)
            .ok_or_else(|| anyhow!("No legal moves available"))
    }
}

/// Plays the highest-ranked legal position from the network's output.
#[derive(Debug, Clone)]
pub struct NetworkPolicy {
    network: Network,
}

impl NetworkPolicy {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    /// Positions ranked by descending probability.
    pub fn ranked_moves(&self, game: &GameState) -> Result<Vec<u8>> {
        let probabilities = self.network.forward(&game.network_input(), None)?;
        Ok(rank_positions(&probabilities))
    }
}

impl Policy for NetworkPolicy {
    fn select_move(&mut self, game: &GameState) -> Result<u8> {
        let free = game.board().available_moves();
        self.ranked_moves(game)?
            .into_iter()
            .find(|&position| free & (1 << (position - 1)) != 0)
            .ok_or_else(|| anyhow!("No legal moves available"))
    }
}
