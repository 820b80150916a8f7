// Stage selection and cascade assembly.

use haaldus_core::character::input_chars;
use haaldus_fst::{Alphabet, Cascade};
use tracing::{debug, debug_span};

use crate::HaaldusError;
use crate::stages::{Stage, compile_stage};
use crate::tables::RuleTables;

/// Which stages a cascade is built from.
///
/// Stages run in a fixed order: rewrites, uncapitalize, fold diacritics,
/// spell, variants, pronounce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    /// Apply the irregular word table.
    pub rewrites: bool,
    /// Lowercase the first character.
    pub uncapitalize: bool,
    /// Generate colloquial variants.
    pub variants: bool,
    /// Apply the pronunciation rules.
    pub pronounce: bool,
    /// Fold foreign diacritics to base letters.
    pub fold_diacritics: bool,
    /// Spell out short runs of letters, digits and punctuation.
    pub spell: bool,
    /// Keep rules that may or may not apply. Without them every stage
    /// except variants maps each input to a single output.
    pub optional_rules: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            rewrites: true,
            uncapitalize: true,
            variants: true,
            pronounce: true,
            fold_diacritics: false,
            spell: false,
            optional_rules: true,
        }
    }
}

impl StageConfig {
    /// Only the spelling-out stage.
    pub fn spelling() -> Self {
        Self {
            rewrites: false,
            uncapitalize: false,
            variants: false,
            pronounce: false,
            fold_diacritics: false,
            spell: true,
            optional_rules: true,
        }
    }

    /// The enabled stages, in application order.
    pub fn stages(&self) -> Vec<Stage> {
        [
            (self.rewrites, Stage::Rewrites),
            (self.uncapitalize, Stage::Uncapitalize),
            (self.fold_diacritics, Stage::FoldDiacritics),
            (self.spell, Stage::Spell),
            (self.variants, Stage::Variants),
            (self.pronounce, Stage::Pronounce),
        ]
        .into_iter()
        .filter_map(|(enabled, stage)| enabled.then_some(stage))
        .collect()
    }
}

/// The alphabet every cascade reads.
pub fn input_alphabet() -> Alphabet {
    Alphabet::new(input_chars())
}

/// Compile the enabled stages and compose them into one cascade.
///
/// The result depends only on `config` and `tables`.
pub fn build_cascade(config: &StageConfig, tables: &RuleTables) -> Result<Cascade, HaaldusError> {
    let span = debug_span!("build_cascade");
    let _guard = span.enter();

    let alphabet = input_alphabet();
    let mut compiled = Vec::new();
    for stage in config.stages() {
        let rules = stage.rules(tables)?;
        compiled.push(compile_stage(stage, &rules, &alphabet, config.optional_rules)?);
    }
    let cascade = Cascade::new(compiled, alphabet)?;
    debug!(
        states = cascade.fst().num_states(),
        transitions = cascade.fst().num_transitions(),
        "cascade built"
    );
    Ok(cascade)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stages_match_transformer_order() {
        let stages = StageConfig::default().stages();
        assert_eq!(
            stages,
            vec![Stage::Rewrites, Stage::Uncapitalize, Stage::Variants, Stage::Pronounce]
        );
        assert_eq!(StageConfig::spelling().stages(), vec![Stage::Spell]);
    }

    #[test]
    fn no_stages_is_identity() {
        let config = StageConfig {
            rewrites: false,
            uncapitalize: false,
            variants: false,
            pronounce: false,
            ..StageConfig::default()
        };
        let cascade = build_cascade(&config, &RuleTables::default()).unwrap();
        let out = cascade.decode("Tere", &Default::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Tere");
    }

    #[test]
    fn invalid_input_symbol() {
        let config = StageConfig {
            variants: false,
            pronounce: false,
            ..StageConfig::default()
        };
        let cascade = build_cascade(&config, &RuleTables::default()).unwrap();
        let err = cascade.decode("tere!", &Default::default()).unwrap_err();
        assert!(matches!(err, haaldus_fst::FstError::InvalidSymbol { symbol: '!', position: 4 }));
    }
}
