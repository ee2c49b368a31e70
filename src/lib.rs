//! Authoritative rules engine of a turn-based hexagonal strategy game.
//!
//! Actions are checked and resolved into `WorldChange` facts,
//! the facts are applied to a `World` and can be replayed anywhere.

pub mod error;
pub mod game;
pub mod map;
pub mod utils;

pub use crate::error::{Error, Illegal};
