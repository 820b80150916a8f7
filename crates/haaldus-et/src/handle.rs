// Haaldus: top-level integration point for Estonian G2P and P2G.
//
// Owns the compiled pronunciation cascade, a separate spelling-out cascade
// and the decode options, and exposes the conversions in both directions.
//
// Design notes:
// - Both cascades are compiled once at construction; every conversion
//   borrows them immutably, so one handle serves any number of threads.
// - The inverse cascade is built on the first P2G call and cached inside
//   the cascade.
// - `Haaldus::shared()` builds a process-wide handle from the bundled rule
//   tables on first use.

use std::path::Path;
use std::sync::OnceLock;

use haaldus_core::Hypothesis;
use haaldus_fst::{Cascade, DecodeConfig, LanguageModel};
use tracing::info;

use crate::HaaldusError;
use crate::cascade::{StageConfig, build_cascade};
use crate::tables::RuleTables;

static SHARED: OnceLock<Result<Haaldus, HaaldusError>> = OnceLock::new();

/// Estonian pronunciation converter.
///
/// G2P maps a written word to its ranked pronunciations; P2G maps a
/// pronunciation to ranked spellings, optionally rescored with a language
/// model over spellings.
#[derive(Debug)]
pub struct Haaldus {
    /// Spelling to pronunciation, with its cached inverse.
    cascade: Cascade,

    /// Spelling out of letters, digits and punctuation.
    speller: Cascade,

    // -- Options --
    /// Result count, uniqueness and search bound for every conversion.
    config: DecodeConfig,
}

impl Haaldus {
    /// Build a handle from rule tables, with the stages selected by `stages`.
    pub fn new(stages: &StageConfig, tables: &RuleTables) -> Result<Self, HaaldusError> {
        let cascade = build_cascade(stages, tables)?;
        let speller = build_cascade(&StageConfig::spelling(), tables)?;
        Ok(Self {
            cascade,
            speller,
            config: DecodeConfig::default(),
        })
    }

    /// Build the default cascade from the bundled rule tables.
    pub fn bundled() -> Result<Self, HaaldusError> {
        Self::new(&StageConfig::default(), &RuleTables::bundled()?)
    }

    /// Build the default cascade from the rule tables in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, HaaldusError> {
        Self::new(&StageConfig::default(), &RuleTables::from_dir(dir)?)
    }

    /// The process-wide handle built from the bundled rule tables.
    ///
    /// Built on first call; later calls return the same handle, or the same
    /// build error.
    pub fn shared() -> Result<&'static Haaldus, &'static HaaldusError> {
        SHARED
            .get_or_init(|| {
                let handle = Self::bundled();
                if handle.is_ok() {
                    info!("shared pronunciation cascade built");
                }
                handle
            })
            .as_ref()
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Pronunciations of a written word, best first.
    ///
    /// An empty list means the cascade rejects the word. Characters outside
    /// the input alphabet are an error.
    pub fn g2p(&self, word: &str) -> Result<Vec<Hypothesis>, HaaldusError> {
        Ok(self.cascade.decode(word, &self.config)?)
    }

    /// Spellings of a pronunciation, best first.
    ///
    /// With a language model the spellings are rescored by it, and those
    /// it rejects are dropped.
    pub fn p2g(&self, pron: &str, model: Option<&LanguageModel>) -> Result<Vec<Hypothesis>, HaaldusError> {
        Ok(self.cascade.decode_inverse(pron, model, &self.config)?)
    }

    /// Spell out a token of 2 to 4 letters, digits or punctuation marks by
    /// name. Tokens are separated by symbols such as `+` or `.`; longer
    /// tokens, like ordinary words, are returned unchanged.
    pub fn spell_out(&self, token: &str) -> Result<Vec<Hypothesis>, HaaldusError> {
        Ok(self.speller.decode(token, &self.config)?)
    }

    /// Read a language model over spellings from a binary model file.
    pub fn load_language_model(&self, path: &Path) -> Result<LanguageModel, HaaldusError> {
        let data = std::fs::read(path).map_err(|source| HaaldusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(LanguageModel::from_bytes(&data, self.cascade.alphabet())?)
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    pub fn decode_config(&self) -> &DecodeConfig {
        &self.config
    }

    // =========================================================================
    // Option setters
    // =========================================================================

    /// Maximum number of hypotheses per conversion.
    pub fn set_n_best(&mut self, value: usize) {
        self.config.n_best = value;
    }

    pub fn set_unique(&mut self, value: bool) {
        self.config.unique = value;
    }

    /// Maximum number of search steps per conversion.
    pub fn set_max_visits(&mut self, value: usize) {
        self.config.max_visits = value;
    }

    /// Return the crate version (from Cargo.toml).
    pub fn get_version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Haaldus {
        let stages = StageConfig {
            rewrites: false,
            variants: false,
            pronounce: false,
            ..StageConfig::default()
        };
        let tables = RuleTables::parse("", "", "1 üks\n2 kaks\n").unwrap();
        Haaldus::new(&stages, &tables).unwrap()
    }

    #[test]
    fn handle_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Haaldus>();
    }

    #[test]
    fn setters_update_decode_config() {
        let mut handle = small();
        handle.set_n_best(7);
        handle.set_unique(false);
        handle.set_max_visits(10);
        assert_eq!(handle.decode_config().n_best, 7);
        assert!(!handle.decode_config().unique);
        assert_eq!(handle.decode_config().max_visits, 10);
    }

    #[test]
    fn conversions_in_both_directions() {
        let handle = small();
        assert_eq!(handle.g2p("Tere").unwrap()[0].text, "tere");
        let spellings: Vec<String> = handle.p2g("tere", None).unwrap().into_iter().map(|h| h.text).collect();
        assert_eq!(spellings.len(), 2);
        assert!(spellings.contains(&"tere".to_string()));
        assert!(spellings.contains(&"Tere".to_string()));
        assert_eq!(handle.spell_out("21").unwrap()[0].text, "kaksüks");
    }

    #[test]
    fn missing_model_file_is_io_error() {
        let err = small().load_language_model(Path::new("/nonexistent/lm.fst")).unwrap_err();
        assert!(matches!(err, HaaldusError::Io { .. }));
    }

    #[test]
    fn version_is_set() {
        assert!(!Haaldus::get_version().is_empty());
    }
}
