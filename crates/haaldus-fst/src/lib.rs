//! Weighted finite-state transducer engine for Haaldus.
//!
//! This crate builds transducers from literal string pairs, unions, closures
//! and context-dependent rewrite rules, composes them into cascades, and
//! decodes input strings into ranked hypothesis lists. All weights live in
//! the tropical semiring.
//!
//! # Architecture
//!
//! - [`weight`] -- Tropical semiring weight
//! - [`symbols`] -- Labels, symbol tables, symbol spaces and alphabets
//! - [`transition`] -- Transition struct and its binary record layout
//! - [`fst`] -- Arena-backed mutable transducer
//! - [`algebra`] -- Construction algebra (cross, union, concat, closure, ...)
//! - [`compose`] -- Composition with the epsilon-sequencing filter
//! - [`optimize`] -- Connect, epsilon removal, determinization, minimization
//! - [`rewrite`] -- Context-dependent rewrite rule compiler
//! - [`paths`] -- Shortest distance and n-best path extraction
//! - [`lattice`] -- Cascades, lattice decoding, inversion and rescoring
//! - [`format`] -- Binary model file header and (de)serialization
//! - [`config`] -- Decode configuration

pub mod algebra;
pub mod compose;
pub mod config;
pub mod format;
pub mod fst;
pub mod lattice;
pub mod optimize;
pub mod paths;
pub mod rewrite;
pub mod symbols;
pub mod transition;
pub mod weight;

pub use config::DecodeConfig;
pub use fst::{Fst, StateId};
pub use lattice::{Bridge, Cascade, LanguageModel};
pub use rewrite::{Context, RewriteMode, RewriteRule};
pub use symbols::{Alphabet, EPSILON, Label, SymbolSpace, SymbolTable};
pub use transition::Transition;
pub use weight::Weight;

/// Error type for transducer construction, composition, decoding and
/// model loading.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("symbol {symbol:?} at position {position} is outside the alphabet")]
    InvalidSymbol { symbol: char, position: usize },
    #[error("cannot compose: left output tape is {left}, right input tape is {right}")]
    ComposeMismatch { left: String, right: String },
    #[error("{0} requires an acceptor")]
    NotAnAcceptor(&'static str),
    #[error("label {0} has no entry in the target symbol space")]
    UnknownLabel(Label),
    #[error("invalid magic number in model header")]
    InvalidMagic,
    #[error("unsupported model format version {0}")]
    UnsupportedVersion(u8),
    #[error("file too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("invalid symbol table: {0}")]
    InvalidSymbolTable(String),
    #[error("invalid state table: {0}")]
    InvalidStateTable(String),
    #[error("language model: {0}")]
    InvalidModel(String),
}

/// Maximum number of queue pops in n-best path extraction.
/// Acts as a safety limit against exponential lattices built by malformed
/// rule cascades.
pub const MAX_VISIT_COUNT: usize = 100_000;

/// Maximum number of states produced by a single determinization. When the
/// limit is reached `optimize` keeps the epsilon-free machine instead.
pub const MAX_DETERMINIZED_STATES: usize = 250_000;
