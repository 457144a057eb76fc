use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::action::Direction;
use super::arena::is_interior;
use super::state::{Point, Snake};
use crate::error::{GameError, GameResult};

/// Configuration for the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of the game grid, walls included
    pub grid_width: usize,
    /// Height of the game grid, walls included
    pub grid_height: usize,
    /// Delay between two ticks of the engine loop
    pub tick_delay_ms: u64,
    /// Initial length of the snake
    pub initial_snake_length: usize,
    /// Direction the snake travels when a game starts
    pub start_direction: Direction,
    /// Head position at game start; the grid centre when unset
    pub start_position: Option<(i32, i32)>,
    /// Seed for food placement; entropy when unset
    pub seed: Option<u64>,
    /// Random food samples tried before scanning for free cells
    pub max_food_attempts: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_height: 20,
            tick_delay_ms: 100,
            initial_snake_length: 3,
            start_direction: Direction::Up,
            start_position: None,
            seed: None,
            max_food_attempts: 10_000,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10, 10)
    }

    /// Create a large grid
    pub fn large() -> Self {
        Self::new(30, 30)
    }

    /// Sub-millisecond remainders round up, so a non-zero delay never becomes zero
    pub fn with_tick_delay(mut self, delay: Duration) -> Self {
        let millis = delay.as_millis() + u128::from(delay.subsec_nanos() % 1_000_000 != 0);
        self.tick_delay_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn tick_delay(&self) -> Duration {
        Duration::from_millis(self.tick_delay_ms)
    }

    pub fn start_head(&self) -> Point {
        match self.start_position {
            Some((x, y)) => Point::new(x, y),
            None => Point::new(
                (self.grid_width / 2) as i32,
                (self.grid_height / 2) as i32,
            ),
        }
    }

    /// The snake every game starts with
    pub fn initial_snake(&self) -> Snake {
        Snake::new(
            self.start_head(),
            self.initial_snake_length,
            self.start_direction,
        )
    }

    /// Load a JSON config; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| GameError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GameConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the arena can hold the initial snake plus one food cell
    pub fn validate(&self) -> GameResult<()> {
        if self.grid_width < 3 || self.grid_height < 3 {
            return Err(GameError::InvalidConfig(format!(
                "arena {}x{} has no interior, need at least 3x3",
                self.grid_width, self.grid_height
            )));
        }
        if self.initial_snake_length == 0 {
            return Err(GameError::InvalidConfig(
                "initial snake length must be at least 1".to_string(),
            ));
        }
        if self.tick_delay_ms == 0 {
            return Err(GameError::InvalidConfig(
                "tick delay must be positive".to_string(),
            ));
        }

        let snake = self.initial_snake();
        if let Some(outside) = snake
            .points()
            .into_iter()
            .find(|p| !is_interior(*p, self.grid_width, self.grid_height))
        {
            return Err(GameError::InvalidConfig(format!(
                "initial snake segment ({outside}) lies outside the {}x{} arena interior",
                self.grid_width, self.grid_height
            )));
        }

        let interior = (self.grid_width - 2) * (self.grid_height - 2);
        if snake.len() >= interior {
            return Err(GameError::InvalidConfig(format!(
                "snake of length {} leaves no room for food in a {interior}-cell interior",
                snake.len()
            )));
        }

        Ok(())
    }
}
