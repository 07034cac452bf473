//! REST implementation of the Cozi client handle.

pub mod cozi;
mod wire;

pub use cozi::{CoziClient, DEFAULT_BASE_URL};
