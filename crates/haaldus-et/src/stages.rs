// Cascade stages: rule lists and their compilation.
//
// Each stage is an ordered list of rules. A stage compiles to the
// composition of its rules, starting from the identity over the alphabet
// and optimizing after every step; rule order is significant.

use haaldus_core::character::{
    ESTONIAN_VOWELS, PLOSIVE_LEFT_CONTEXT, PLOSIVE_RIGHT_CONTEXT, SPELL_DIGITS, SPELL_LETTERS,
    SPELL_PUNCTUATION, diacritic_folding_pairs, input_chars, lowercase_pairs,
};
use haaldus_fst::algebra::{difference, label_set, label_star, literal_cross, star, string_map};
use haaldus_fst::compose::compose;
use haaldus_fst::optimize::optimize;
use haaldus_fst::{Alphabet, Context, Fst, FstError, Label, RewriteMode, RewriteRule, Weight};
use tracing::{debug, debug_span};

use crate::rules::RuleKind;
use crate::tables::RuleTables;

/// Foreign spellings and letters mapped to their Estonian rendering.
const TRANSLITERATIONS: &[(&str, &str)] = &[
    ("ž", "š"),
    ("s~", "š"),
    ("z~", "š"),
    ("ø", "ö"),
    ("q", "k"),
    ("kk", "K"),
    ("pp", "P"),
    ("tt", "T"),
    ("ph", "f"),
    ("x", "ks"),
    ("sch", "š"),
    ("cz", "tš"),
    ("ici", "itsi"),
    ("zz", "ts"),
    ("w", "v"),
    ("y", "i"),
    ("z", "s"),
    ("ć", "tš"),
    ("č", "tš"),
    ("ç", "ts"),
    ("ĉ", "tš"),
    ("c", "k"),
    ("jj", "ij"),
];

/// A cascade stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Irregular words from `rewrites.txt`.
    Rewrites,
    /// Lowercase the first character.
    Uncapitalize,
    /// Fold foreign diacritics to base letters.
    FoldDiacritics,
    /// Spell out short runs of letters, digits and punctuation.
    Spell,
    /// Optional colloquial variants.
    Variants,
    /// Spelling-to-pronunciation rules.
    Pronounce,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Rewrites => "rewrites",
            Stage::Uncapitalize => "uncapitalize",
            Stage::FoldDiacritics => "fold-diacritics",
            Stage::Spell => "spell",
            Stage::Variants => "variants",
            Stage::Pronounce => "pronounce",
        }
    }

    /// The stage's rules, in application order.
    pub fn rules(self, tables: &RuleTables) -> Result<Vec<RuleKind>, FstError> {
        Ok(match self {
            Stage::Rewrites => rewrite_rules(tables),
            Stage::Uncapitalize => uncapitalize_rules(),
            Stage::FoldDiacritics => folding_rules(),
            Stage::Spell => spelling_rules(tables),
            Stage::Variants => variant_rules(tables),
            Stage::Pronounce => pronunciation_rules()?,
        })
    }
}

/// Compose `rules` into one transducer over `alphabet`.
///
/// Optional rules are dropped when `keep_optional` is false.
pub fn compile_stage(
    stage: Stage,
    rules: &[RuleKind],
    alphabet: &Alphabet,
    keep_optional: bool,
) -> Result<Fst, FstError> {
    let span = debug_span!("stage", name = stage.name(), rules = rules.len());
    let _guard = span.enter();

    let mut result = alphabet.sigma_star();
    for rule in rules.iter().filter(|r| keep_optional || !r.is_optional()) {
        let compiled = rule.compile(alphabet)?;
        result = compose(&result, &compiled)?;
        optimize(&mut result);
    }
    debug!(
        states = result.num_states(),
        transitions = result.num_transitions(),
        "stage compiled"
    );
    Ok(result)
}

// ============================================================================
// Rule lists
// ============================================================================

fn chars(s: &str) -> Context {
    Context::chars(s)
}

fn vowels() -> Context {
    Context::from_fst(vowel_set())
}

fn vowel_set() -> Fst {
    let labels: Vec<Label> = ESTONIAN_VOWELS.iter().map(|&c| c as Label).collect();
    label_set(&labels)
}

fn rewrite(from: &str, to: &str) -> RewriteRule {
    RewriteRule::new(literal_cross(from, to, Weight::ONE))
}

/// One rule per irregular word, longest word first.
pub fn rewrite_rules(tables: &RuleTables) -> Vec<RuleKind> {
    tables
        .rewrites
        .iter()
        .map(|entry| RuleKind::LiteralRewrite {
            word: entry.word.clone(),
            alternatives: entry.alternatives.clone(),
        })
        .collect()
}

/// Lowercase the first character of the input.
pub fn uncapitalize_rules() -> Vec<RuleKind> {
    vec![RuleKind::ContextualRewrite(
        RewriteRule::new(char_map(lowercase_pairs())).left(Context::bos()),
    )]
}

/// Replace foreign letters with diacritics by their base letter, anywhere.
pub fn folding_rules() -> Vec<RuleKind> {
    vec![RuleKind::ContextualRewrite(RewriteRule::new(char_map(
        diacritic_folding_pairs(),
    )))]
}

fn char_map(pairs: Vec<(char, char)>) -> Fst {
    let pairs: Vec<(String, String)> = pairs.into_iter().map(|(a, b)| (a.to_string(), b.to_string())).collect();
    string_map(pairs.iter().map(|(a, b)| (a.as_str(), b.as_str())))
}

/// Spell out tokens of 2 to 4 spellable symbols by name.
///
/// Tokens are delimited by the input symbols that are neither letters,
/// digits nor spellable punctuation.
pub fn spelling_rules(tables: &RuleTables) -> Vec<RuleKind> {
    let spellable: Vec<char> = SPELL_LETTERS
        .chars()
        .chain(SPELL_DIGITS.chars())
        .chain(SPELL_PUNCTUATION.chars())
        .collect();
    let delimiters = input_chars()
        .into_iter()
        .filter(|c| !c.is_alphanumeric() && !spellable.contains(c))
        .collect();
    vec![RuleKind::SpellingExpansion {
        names: tables.letters.clone(),
        delimiters,
    }]
}

/// Colloquial variants, each of which may or may not apply.
pub fn variant_rules(tables: &RuleTables) -> Vec<RuleKind> {
    let mut rules = vec![
        RuleKind::VariantAlternation(rewrite("selle", "sele").left(Context::bos())),
        RuleKind::VariantAlternation(rewrite("nud", "nd").left(vowels()).right(Context::eos())),
        RuleKind::VariantAlternation(rewrite("äe", "ää")),
    ];
    if !tables.variants.is_empty() {
        let tau = string_map(tables.variants.iter().map(|(a, b)| (a.as_str(), b.as_str())));
        rules.push(RuleKind::VariantAlternation(
            RewriteRule::new(tau).left(Context::bos()).right(Context::eos()),
        ));
    }
    rules
}

/// Estonian spelling-to-pronunciation rules, in application order.
pub fn pronunciation_rules() -> Result<Vec<RuleKind>, FstError> {
    use RuleKind::ContextualRewrite as Rule;

    let optional = RewriteMode::Optional;
    let plosive_left = || chars(PLOSIVE_LEFT_CONTEXT);
    let plosive_right = || chars(PLOSIVE_RIGHT_CONTEXT).or(Context::eos());
    let vowels_but_i = || {
        let other: String = ESTONIAN_VOWELS.iter().filter(|&&c| c != 'i').collect();
        chars(&other)
    };
    let letters: Vec<Label> = input_chars().into_iter().map(|c| c as Label).collect();
    let not_vowel = Context::from_fst(difference(&label_star(&letters), &vowel_set())?);

    Ok(vec![
        // Digraphs and c.
        Rule(rewrite("ch", "tš").left(Context::bos()).right(vowels())),
        Rule(rewrite("chr", "kr").left(Context::bos())),
        Rule(rewrite("ch", "hh").left(vowels())),
        Rule(rewrite("ck", "K").left(vowels())),
        Rule(rewrite("c", "s").right(chars("i"))),
        Rule(rewrite("c", "ts").left(chars("rln")).right(chars("ei"))),
        // Foreign letters and spellings.
        Rule(RewriteRule::new(star(string_map(TRANSLITERATIONS.iter().copied())))),
        Rule(rewrite("sh", "š").left(vowels()).right(vowels()).mode(optional)),
        // Long plosives between sonorants.
        Rule(rewrite("k", "K").left(plosive_left()).right(plosive_right())),
        Rule(rewrite("p", "P").left(plosive_left()).right(plosive_right())),
        Rule(rewrite("t", "T").left(plosive_left()).right(plosive_right())),
        // Devoicing.
        Rule(rewrite("g", "k")),
        Rule(rewrite("b", "p")),
        Rule(rewrite("d", "t")),
        // Glides.
        Rule(rewrite("i", "ij").left(vowels()).right(vowels_but_i()).mode(optional)),
        Rule(rewrite("i", "j").left(not_vowel).right(vowels_but_i()).mode(optional)),
    ])
}
