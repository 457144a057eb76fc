//! Snake Engine - the simulation core of a Snake game
//!
//! This library provides:
//! - Core game logic (game module): grid model, snake rules, food placement
//!   and the fixed-tick engine loop
//! - Session metrics for front-ends (metrics module)
//! - A headless driver that plays the engine the way a presentation layer
//!   would (modes module)

pub mod error;
pub mod game;
pub mod metrics;
pub mod modes;

pub use error::{GameError, GameResult};
