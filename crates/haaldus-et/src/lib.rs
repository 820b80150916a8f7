//! Estonian grapheme-to-phoneme and phoneme-to-grapheme conversion.
//!
//! Rule tables and built-in rule lists are compiled into weighted
//! transducers with `haaldus-fst`, composed into one cascade, and run in
//! either direction through the [`Haaldus`] handle.
//!
//! # Architecture
//!
//! - [`tables`] -- Rule table parsing (`rewrites.txt`, `variants.txt`, `letters.map`)
//! - [`rules`] -- Closed set of rule kinds and their compilation
//! - [`stages`] -- Stage builders: rewrites, capitalization, variants, pronunciation, spelling
//! - [`cascade`] -- Stage selection and cascade assembly
//! - [`notation`] -- Plain-ASCII pronunciation notation
//! - [`handle`] -- The `Haaldus` handle and its shared instance

pub mod cascade;
pub mod handle;
pub mod notation;
pub mod rules;
pub mod stages;
pub mod tables;

use std::path::PathBuf;

pub use cascade::{StageConfig, build_cascade};
pub use handle::Haaldus;
pub use tables::RuleTables;

/// Error type for loading rule tables and building or running cascades.
#[derive(Debug, thiserror::Error)]
pub enum HaaldusError {
    /// A rule table row could not be parsed.
    #[error("{file}:{line}: {reason}")]
    ConfigParse {
        file: String,
        line: usize,
        reason: String,
    },

    /// A rule table or model file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transducer construction or decoding failed.
    #[error(transparent)]
    Fst(#[from] haaldus_fst::FstError),
}
