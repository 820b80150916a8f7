//! End-to-end tests: bundled rule tables compiled into full cascades and
//! run in both directions.
//!
//! Run: cargo test -p haaldus-et --test pipeline

use std::sync::Arc;

use haaldus_core::Hypothesis;
use haaldus_et::handle::Haaldus;
use haaldus_et::stages::Stage;
use haaldus_et::{RuleTables, StageConfig};
use haaldus_fst::algebra::invert;
use haaldus_fst::compose::compose;
use haaldus_fst::lattice::decode;
use haaldus_fst::optimize::optimize;
use haaldus_fst::paths::n_shortest_paths;
use haaldus_fst::{
    Alphabet, DecodeConfig, Fst, LanguageModel, SymbolSpace, SymbolTable, Transition, Weight,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn shared() -> &'static Haaldus {
    Haaldus::shared().expect("bundled cascade builds")
}

fn texts(hypotheses: &[Hypothesis]) -> Vec<&str> {
    hypotheses.iter().map(|h| h.text.as_str()).collect()
}

fn top(hypotheses: &[Hypothesis]) -> &str {
    hypotheses.first().map(|h| h.text.as_str()).unwrap_or("")
}

/// Single-character unigram model over `alphabet` where `g` costs 3.
fn unigram_model(alphabet: &Alphabet) -> LanguageModel {
    let mut table = SymbolTable::new();
    let labels: Vec<(char, u32)> = alphabet
        .chars()
        .iter()
        .map(|&c| (c, table.add_symbol(&c.to_string())))
        .collect();
    let space = SymbolSpace::Table(Arc::new(table));
    let mut fst = Fst::with_spaces(space.clone(), space);
    let s = fst.add_state();
    fst.set_start(s);
    fst.set_final(s, Weight::ONE);
    for (c, label) in labels {
        let cost = if c == 'g' { Weight::new(3.0) } else { Weight::ONE };
        fst.add_transition(s, Transition::new(label, label, cost, s));
    }
    LanguageModel::new(fst, alphabet).expect("valid model")
}

// ---------------------------------------------------------------------------
// Grapheme to phoneme
// ---------------------------------------------------------------------------

#[test]
fn word_initial_ch_before_vowel() {
    let out = shared().g2p("chaos").unwrap();
    assert_eq!(top(&out), "tšaos");
}

#[test]
fn medial_ch_is_not_affricate() {
    let out = shared().g2p("lich").unwrap();
    assert!(!out.is_empty());
    assert!(out.iter().all(|h| !h.text.starts_with("tš")));
    assert!(texts(&out).contains(&"lihh"));
}

#[test]
fn capitalized_word_is_lowercased() {
    assert_eq!(top(&shared().g2p("Chaos").unwrap()), "tšaos");
}

#[test]
fn irregular_word_table_applies() {
    assert_eq!(top(&shared().g2p("selle").unwrap()), "sele");
    assert_eq!(top(&shared().g2p("sellest").unwrap()), "selest");
}

#[test]
fn n_best_is_ordered_unique_and_bounded() {
    let out = shared().g2p("maia").unwrap();
    assert!(!out.is_empty());
    assert!(out.len() <= shared().decode_config().n_best);
    assert!(out.windows(2).all(|w| w[0].weight <= w[1].weight));
    let mut seen = texts(&out);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), out.len());
}

#[test]
fn out_of_alphabet_character_is_an_error() {
    assert!(shared().g2p("tere?").is_err());
}

// ---------------------------------------------------------------------------
// Spelling out
// ---------------------------------------------------------------------------

#[test]
fn digits_are_spelled_out() {
    assert_eq!(top(&shared().spell_out("12").unwrap()), "ükskaks");
}

#[test]
fn single_character_is_not_spelled_out() {
    assert_eq!(top(&shared().spell_out("a").unwrap()), "a");
}

#[test]
fn ordinary_words_are_not_spelled_out() {
    for word in ["tallinn", "selle", "kalad"] {
        assert_eq!(texts(&shared().spell_out(word).unwrap()), vec![word]);
    }
    assert_eq!(top(&shared().spell_out("tv").unwrap()), "teevee");
}

// ---------------------------------------------------------------------------
// Phoneme to grapheme
// ---------------------------------------------------------------------------

#[test]
fn round_trip_without_optional_rules() {
    let stages = StageConfig {
        variants: false,
        optional_rules: false,
        ..StageConfig::default()
    };
    let tables = RuleTables::bundled().unwrap();
    let handle = Haaldus::new(&stages, &tables).unwrap();

    for word in ["kala", "habe", "lakk", "Tallinn"] {
        let pron = handle.g2p(word).unwrap();
        assert!(!pron.is_empty(), "{word} has no pronunciation");
        let spellings = handle.p2g(top(&pron), None).unwrap();
        assert!(!spellings.is_empty(), "{word}: no spelling for {}", top(&pron));
        let again = handle.g2p(top(&spellings)).unwrap();
        assert_eq!(top(&again), top(&pron), "round trip of {word}");
    }
}

#[test]
fn language_model_reranks_spellings() {
    let handle = shared();
    let plain = handle.p2g("kala", None).unwrap();
    assert!(!plain.is_empty());

    let model = unigram_model(handle.cascade().alphabet());
    let scored = handle.p2g("kala", Some(&model)).unwrap();
    assert!(!scored.is_empty());
    assert!(scored.iter().all(|h| h.weight == 0.0));
    assert!(scored.iter().all(|h| !h.text.contains('g')));
}

// ---------------------------------------------------------------------------
// Engine properties on the real cascade
// ---------------------------------------------------------------------------

#[test]
fn double_inversion_preserves_outputs() {
    let cascade = shared().cascade();
    let mut twice = cascade.fst().clone();
    invert(&mut twice);
    invert(&mut twice);
    let config = DecodeConfig::default().with_n_best(10);
    for word in ["chaos", "lich", "kala"] {
        assert_eq!(
            decode(&twice, cascade.alphabet(), word, &config).unwrap(),
            cascade.decode(word, &config).unwrap()
        );
    }
}

#[test]
fn optimize_preserves_outputs() {
    let alphabet = Alphabet::new(haaldus_core::character::input_chars());
    let tables = RuleTables::default();
    let mut rules = Stage::Uncapitalize.rules(&tables).unwrap();
    let pronounce = Stage::Pronounce.rules(&tables).unwrap();
    // ch, ck, k gemination, b devoicing and the optional ij glide.
    rules.extend([0, 3, 8, 12, 14].map(|i| pronounce[i].clone()));

    // Composed without any optimization in between.
    let mut raw = alphabet.sigma_star();
    for rule in &rules {
        raw = compose(&raw, &rule.compile(&alphabet).unwrap()).unwrap();
    }
    let mut optimized = raw.clone();
    optimize(&mut optimized);

    let config = DecodeConfig::default().with_n_best(10);
    for word in ["Chaos", "lakk", "maia", "habe"] {
        let lattice = compose(&alphabet.acceptor(word).unwrap(), &raw).unwrap();
        let mut before = n_shortest_paths(&lattice, &config);
        let lattice = compose(&alphabet.acceptor(word).unwrap(), &optimized).unwrap();
        let mut after = n_shortest_paths(&lattice, &config);
        assert!(!before.is_empty(), "{word}");
        before.sort_by(|x, y| x.text.cmp(&y.text));
        after.sort_by(|x, y| x.text.cmp(&y.text));
        assert_eq!(before, after, "{word}");
    }
}
