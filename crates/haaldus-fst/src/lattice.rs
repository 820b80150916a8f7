// Cascades, lattice decoding, the inverse direction and language-model
// rescoring.

use std::sync::{Arc, OnceLock};

use haaldus_core::Hypothesis;
use tracing::debug;

use crate::FstError;
use crate::algebra::{ProjectSide, invert, project, star, union};
use crate::compose::compose;
use crate::config::DecodeConfig;
use crate::fst::Fst;
use crate::optimize::optimize;
use crate::paths::n_shortest_paths;
use crate::symbols::{Alphabet, EPSILON, Label, SymbolSpace, SymbolTable};
use crate::transition::Transition;
use crate::weight::Weight;

/// An ordered list of stages composed into one transducer.
///
/// The inverse direction is computed on first use and shared by every later
/// call on the same cascade.
#[derive(Debug)]
pub struct Cascade {
    forward: Fst,
    inverse: OnceLock<Fst>,
    alphabet: Alphabet,
    output_alphabet: Alphabet,
}

impl Cascade {
    /// Compose `stages` left to right over `alphabet`, optimizing after
    /// each step.
    pub fn new(stages: impl IntoIterator<Item = Fst>, alphabet: Alphabet) -> Result<Self, FstError> {
        let mut forward = alphabet.sigma_star();
        for (index, stage) in stages.into_iter().enumerate() {
            forward = compose(&forward, &stage)?;
            optimize(&mut forward);
            debug!(
                stage = index,
                states = forward.num_states(),
                transitions = forward.num_transitions(),
                "composed cascade stage"
            );
        }
        Ok(Self::from_fst(forward, alphabet))
    }

    /// Wrap an already composed transducer.
    pub fn from_fst(mut forward: Fst, alphabet: Alphabet) -> Self {
        forward.sort_transitions_by_input();
        let output_alphabet = Alphabet::new(
            forward
                .states()
                .flat_map(|s| forward.transitions(s).iter().map(|t| t.sym_out))
                .filter(|&l| l != EPSILON)
                .filter_map(char::from_u32),
        );
        Self {
            forward,
            inverse: OnceLock::new(),
            alphabet,
            output_alphabet,
        }
    }

    pub fn fst(&self) -> &Fst {
        &self.forward
    }

    /// Characters accepted by the forward direction.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Characters the forward direction can emit, which are the characters
    /// the inverse direction accepts.
    pub fn output_alphabet(&self) -> &Alphabet {
        &self.output_alphabet
    }

    /// The inverted and optimized cascade.
    pub fn inverse(&self) -> &Fst {
        self.inverse.get_or_init(|| {
            let mut inverse = self.forward.clone();
            invert(&mut inverse);
            optimize(&mut inverse);
            debug!(
                states = inverse.num_states(),
                transitions = inverse.num_transitions(),
                "built inverse cascade"
            );
            inverse
        })
    }

    /// Output lattice of `input` in the forward direction.
    pub fn lattice(&self, input: &str) -> Result<Fst, FstError> {
        lattice(&self.forward, &self.alphabet, input)
    }

    /// Ranked forward outputs of `input`.
    pub fn decode(&self, input: &str, config: &DecodeConfig) -> Result<Vec<Hypothesis>, FstError> {
        decode(&self.forward, &self.alphabet, input, config)
    }

    /// Ranked inverse outputs of `input`, optionally rescored by `model`.
    pub fn decode_inverse(
        &self,
        input: &str,
        model: Option<&LanguageModel>,
        config: &DecodeConfig,
    ) -> Result<Vec<Hypothesis>, FstError> {
        let lattice = lattice(self.inverse(), &self.output_alphabet, input)?;
        let lattice = match model {
            Some(model) => rescore(&lattice, model)?,
            None => lattice,
        };
        Ok(n_shortest_paths(&lattice, config))
    }
}

/// Run `input` through `cascade` and return the optimized acceptor of its
/// outputs.
pub fn lattice(cascade: &Fst, alphabet: &Alphabet, input: &str) -> Result<Fst, FstError> {
    let input = alphabet.acceptor(input)?;
    let mut lattice = compose(&input, cascade)?;
    project(&mut lattice, ProjectSide::Output);
    optimize(&mut lattice);
    Ok(lattice)
}

/// Ranked outputs of `input` through `cascade`.
///
/// Fails with [`FstError::InvalidSymbol`] when `input` leaves `alphabet`;
/// an input the cascade rejects yields an empty list.
pub fn decode(
    cascade: &Fst,
    alphabet: &Alphabet,
    input: &str,
    config: &DecodeConfig,
) -> Result<Vec<Hypothesis>, FstError> {
    let lattice = lattice(cascade, alphabet, input)?;
    Ok(n_shortest_paths(&lattice, config))
}

/// Maps character strings to vocabulary labels of a language model and back.
#[derive(Debug, Clone)]
pub struct Bridge {
    to_model: Fst,
    from_model: Fst,
}

impl Bridge {
    /// Build the bridge for every vocabulary entry spelled within
    /// `alphabet`. Each entry maps its characters to its label, emitted on
    /// the first character; sequences of entries are accepted.
    pub fn from_vocabulary(symbols: &Arc<SymbolTable>, alphabet: &Alphabet) -> Result<Self, FstError> {
        let mut skipped = 0usize;
        let mut entries = Vec::new();
        for (label, entry) in symbols.iter() {
            if alphabet.check(entry).is_err() {
                skipped += 1;
                continue;
            }
            entries.push(entry_path(entry, label));
        }
        if entries.is_empty() {
            return Err(FstError::InvalidModel(
                "no vocabulary entry is spelled within the alphabet".into(),
            ));
        }
        debug!(entries = entries.len(), skipped, "built vocabulary bridge");

        let mut to_model = star(union(entries));
        to_model.set_output_space(SymbolSpace::Table(Arc::clone(symbols)));
        optimize(&mut to_model);

        let mut from_model = to_model.clone();
        invert(&mut from_model);
        optimize(&mut from_model);

        Ok(Self { to_model, from_model })
    }

    pub fn to_model(&self) -> &Fst {
        &self.to_model
    }

    pub fn from_model(&self) -> &Fst {
        &self.from_model
    }
}

fn entry_path(entry: &str, label: Label) -> Fst {
    let mut fst = Fst::new();
    let mut state = fst.add_state();
    fst.set_start(state);
    for (i, c) in entry.chars().enumerate() {
        let next = fst.add_state();
        let sym_out = if i == 0 { label } else { EPSILON };
        fst.add_transition(state, Transition::new(c as Label, sym_out, Weight::ONE, next));
        state = next;
    }
    fst.set_final(state, Weight::ONE);
    fst
}

/// An externally supplied weighted acceptor over a symbol-table vocabulary.
#[derive(Debug, Clone)]
pub struct LanguageModel {
    fst: Fst,
    symbols: Arc<SymbolTable>,
    bridge: Bridge,
}

impl LanguageModel {
    /// Wrap `fst`, which must be an acceptor whose tapes range over a symbol
    /// table, and build its bridge from `alphabet`.
    pub fn new(mut fst: Fst, alphabet: &Alphabet) -> Result<Self, FstError> {
        if !fst.is_acceptor() {
            return Err(FstError::NotAnAcceptor("language model"));
        }
        let symbols = match fst.output_space() {
            SymbolSpace::Table(symbols) => Arc::clone(symbols),
            SymbolSpace::Utf8 => {
                return Err(FstError::InvalidModel("output tape has no symbol table".into()));
            }
        };
        fst.set_input_space(SymbolSpace::Table(Arc::clone(&symbols)));
        fst.sort_transitions_by_input();
        let bridge = Bridge::from_vocabulary(&symbols, alphabet)?;
        Ok(Self { fst, symbols, bridge })
    }

    /// Load a model from the binary model format.
    pub fn from_bytes(data: &[u8], alphabet: &Alphabet) -> Result<Self, FstError> {
        Self::new(Fst::from_bytes(data)?, alphabet)
    }

    pub fn fst(&self) -> &Fst {
        &self.fst
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }
}

/// Rescore a character lattice with `model`: lattice, bridge into the
/// vocabulary, model, and bridge back to characters. Paths the model does
/// not accept are dropped.
pub fn rescore(lattice: &Fst, model: &LanguageModel) -> Result<Fst, FstError> {
    let mut scored = compose(lattice, &model.bridge.to_model)?;
    scored = compose(&scored, &model.fst)?;
    scored = compose(&scored, &model.bridge.from_model)?;
    project(&mut scored, ProjectSide::Output);
    optimize(&mut scored);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{acceptor, literal_cross};

    fn texts(hypotheses: &[Hypothesis]) -> Vec<(&str, f32)> {
        hypotheses.iter().map(|h| (h.text.as_str(), h.weight)).collect()
    }

    fn cascade() -> Cascade {
        let stage = star(union([
            literal_cross("x", "a", Weight::new(1.0)),
            literal_cross("y", "a", Weight::new(2.0)),
            literal_cross("z", "b", Weight::ONE),
        ]));
        let alphabet = Alphabet::new("abxyz".chars());
        Cascade::new([stage], alphabet).unwrap()
    }

    /// Unigram model over single characters: `x` costs 5, `y` and `z` cost 0.
    fn char_model(alphabet: &Alphabet) -> LanguageModel {
        let mut table = SymbolTable::new();
        let x = table.add_symbol("x");
        let y = table.add_symbol("y");
        let z = table.add_symbol("z");
        let space = SymbolSpace::Table(Arc::new(table));
        let mut fst = Fst::with_spaces(space.clone(), space);
        let s = fst.add_state();
        fst.set_start(s);
        fst.set_final(s, Weight::ONE);
        fst.add_transition(s, Transition::new(x, x, Weight::new(5.0), s));
        fst.add_transition(s, Transition::new(y, y, Weight::ONE, s));
        fst.add_transition(s, Transition::new(z, z, Weight::ONE, s));
        LanguageModel::new(fst, alphabet).unwrap()
    }

    #[test]
    fn forward_decode() {
        let cascade = cascade();
        let out = cascade.decode("xz", &DecodeConfig::default()).unwrap();
        assert_eq!(texts(&out), vec![("ab", 1.0)]);
    }

    #[test]
    fn out_of_alphabet_input_fails() {
        let err = cascade().decode("xq", &DecodeConfig::default()).unwrap_err();
        assert!(matches!(err, FstError::InvalidSymbol { symbol: 'q', position: 1 }));
    }

    #[test]
    fn rejected_input_is_empty() {
        let stage = literal_cross("x", "a", Weight::ONE);
        let cascade = Cascade::new([stage], Alphabet::new("ax".chars())).unwrap();
        assert!(cascade.decode("a", &DecodeConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn inverse_is_cached() {
        let cascade = cascade();
        let first: *const Fst = cascade.inverse();
        let second: *const Fst = cascade.inverse();
        assert_eq!(first, second);
    }

    #[test]
    fn inverse_decode_ranks_candidates() {
        let cascade = cascade();
        assert_eq!(cascade.output_alphabet().chars(), &['a', 'b']);
        let out = cascade.decode_inverse("ab", None, &DecodeConfig::default()).unwrap();
        assert_eq!(texts(&out), vec![("xz", 1.0), ("yz", 2.0)]);
    }

    #[test]
    fn inverse_rejects_unknown_output_symbol() {
        let err = cascade().decode_inverse("x", None, &DecodeConfig::default()).unwrap_err();
        assert!(matches!(err, FstError::InvalidSymbol { .. }));
    }

    #[test]
    fn language_model_reorders_candidates() {
        let cascade = cascade();
        let model = char_model(cascade.alphabet());
        let out = cascade.decode_inverse("ab", Some(&model), &DecodeConfig::default()).unwrap();
        assert_eq!(texts(&out), vec![("yz", 2.0), ("xz", 6.0)]);
    }

    #[test]
    fn model_round_trips_through_bytes() {
        let cascade = cascade();
        let model = char_model(cascade.alphabet());
        let loaded = LanguageModel::from_bytes(&model.fst().to_bytes(), cascade.alphabet()).unwrap();
        assert_eq!(loaded.symbols().len(), 4);
        let out = cascade.decode_inverse("a", Some(&loaded), &DecodeConfig::default()).unwrap();
        assert_eq!(texts(&out), vec![("y", 2.0), ("x", 6.0)]);
    }

    #[test]
    fn model_requires_symbol_table() {
        let err = LanguageModel::new(acceptor("ab"), &Alphabet::new("ab".chars())).unwrap_err();
        assert!(matches!(err, FstError::InvalidModel(_)));
    }

    #[test]
    fn bridge_skips_foreign_entries() {
        let mut table = SymbolTable::new();
        table.add_symbol("ab");
        table.add_symbol("qq");
        let bridge = Bridge::from_vocabulary(&Arc::new(table), &Alphabet::new("ab".chars())).unwrap();
        let lattice = compose(&acceptor("abab"), bridge.to_model()).unwrap();
        assert!(!lattice.is_empty());
        assert!(compose(&acceptor("a"), bridge.to_model()).unwrap().is_empty());
    }
}
