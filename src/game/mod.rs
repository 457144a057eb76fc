//! Core game logic module for Snake
//!
//! This module contains all the game logic without any I/O or rendering dependencies.
//! A front-end drives it through [`GameEngine`]: lifecycle commands, direction
//! changes and copy-returning queries.

pub mod action;
pub mod arena;
pub mod config;
pub mod engine;
pub mod food;
pub mod state;

// Re-export commonly used types
pub use action::Direction;
pub use arena::create_rect;
pub use config::GameConfig;
pub use engine::{GameEngine, TickOutcome};
pub use food::create_food;
pub use state::{CollisionType, GameSnapshot, GameState, Point, Snake};
