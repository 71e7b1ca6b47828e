use std::time::Duration;

use crate::error::GridError;
use crate::{
    CELL_SIZE, DEFAULT_SEED, FADE_SPEED, OBSTACLE_PROBABILITY, PLAYER_SPEED, ROWS,
    SEARCH_STEP_INTERVAL_MS,
};

/// The handful of settings a game runs with. They are fixed when a
/// [Session](crate::session::Session) is created.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub rows: usize,
    pub obstacle_probability: f64,
    pub search_step_interval: Duration,
    pub player_speed: f32,
    pub cell_size: f32,
    pub fade_speed: u8,
    /// Seeds the generator that hands out one seed per grid build.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> GameConfig {
        GameConfig {
            rows: ROWS,
            obstacle_probability: OBSTACLE_PROBABILITY,
            search_step_interval: Duration::from_millis(SEARCH_STEP_INTERVAL_MS),
            player_speed: PLAYER_SPEED,
            cell_size: CELL_SIZE,
            fade_speed: FADE_SPEED,
            seed: DEFAULT_SEED,
        }
    }
}

impl GameConfig {
    pub fn with_seed(seed: u64) -> GameConfig {
        GameConfig {
            seed,
            ..GameConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if self.rows == 0 {
            return Err(GridError::ZeroSized);
        }
        if !(0.0..=1.0).contains(&self.obstacle_probability) {
            return Err(GridError::InvalidObstacleProbability(
                self.obstacle_probability,
            ));
        }
        if !(self.cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(self.cell_size));
        }
        if !(self.player_speed > 0.0) {
            return Err(GridError::InvalidPlayerSpeed(self.player_speed));
        }
        Ok(())
    }
}
