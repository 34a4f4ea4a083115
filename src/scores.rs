//! Persisted high scores
//!
//! Two counters survive across sessions: the highest block height reached and
//! the most nodes alive at once. Game state itself is never persisted.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::game::state::GameState;

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("high score file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("high score file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScores {
    pub best_height: u64,
    pub best_alive: usize,
}

impl HighScores {
    /// Sample a state; returns true if either record improved
    pub fn record(&mut self, state: &GameState) -> bool {
        let mut improved = false;
        if state.sec > self.best_height {
            self.best_height = state.sec;
            improved = true;
        }
        let alive = state.alive_count();
        if alive > self.best_alive {
            self.best_alive = alive;
            improved = true;
        }
        improved
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Load from a JSON file; a missing file means no records yet
    pub fn load(path: &Path) -> Result<Self, ScoreError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ScoreError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
