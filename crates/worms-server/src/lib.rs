//! Authoritative Screen Worms game server: admission, simulation, and event
//! distribution over UDP.

pub mod board;
pub mod broadcaster;
pub mod cli;
pub mod controller;
pub mod player;
pub mod registry;
pub mod rng;

pub use controller::{GameController, GameState};
