//! Shared types for the Haaldus grapheme/phoneme conversion crates.
//!
//! - [`character`] -- Estonian alphabet, character classes, case folding
//! - [`hypothesis`] -- Ranked transduction results

pub mod character;
pub mod hypothesis;

pub use hypothesis::{Direction, Hypothesis};
