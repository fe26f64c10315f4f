//! Layered feed-forward neural network engine.
//!
//! A [`neural::Network`] chains an input layer, hidden layers and an output
//! layer. Every layer processes a batch of `passes` samples at once, stored
//! one sample per column of a [`matrix::Matrix2`].

pub mod matrix;
pub mod neural;
pub mod prelude;
