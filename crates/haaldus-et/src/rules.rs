// Rule kinds and their compilation to transducers.

use haaldus_fst::algebra::{closure, string_map, union};
use haaldus_fst::rewrite::{BOS, EOS};
use haaldus_fst::{Alphabet, Context, Fst, FstError, Label, RewriteRule, Weight};

/// Every kind of rule a cascade stage is built from.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// A whole word at the start of the input rewritten to any of its
    /// alternatives.
    LiteralRewrite { word: String, alternatives: Vec<String> },
    /// A context-dependent rewrite rule.
    ContextualRewrite(RewriteRule),
    /// A rewrite that may or may not apply: `identity | rule`.
    VariantAlternation(RewriteRule),
    /// A token of 2 to 4 spellable symbols replaced by their names. The
    /// token must touch a string boundary or one of `delimiters` on each
    /// side, so runs inside longer words are left alone.
    SpellingExpansion {
        names: Vec<(String, String)>,
        delimiters: Vec<char>,
    },
}

impl RuleKind {
    /// Whether the rule leaves the unrewritten input as an alternative.
    pub fn is_optional(&self) -> bool {
        match self {
            RuleKind::ContextualRewrite(rule) => rule.is_optional(),
            RuleKind::VariantAlternation(_) => true,
            RuleKind::LiteralRewrite { .. } | RuleKind::SpellingExpansion { .. } => false,
        }
    }

    /// Compile the rule into a transducer over `alphabet`.
    pub fn compile(&self, alphabet: &Alphabet) -> Result<Fst, FstError> {
        match self {
            RuleKind::LiteralRewrite { word, alternatives } => {
                let mut compiled = Vec::with_capacity(alternatives.len());
                for alt in alternatives {
                    let tau = alphabet.cross(word, alt, Weight::ONE)?;
                    compiled.push(RewriteRule::new(tau).left(Context::bos()).compile(alphabet)?);
                }
                Ok(union(compiled))
            }
            RuleKind::ContextualRewrite(rule) => rule.compile(alphabet),
            RuleKind::VariantAlternation(rule) => Ok(union([alphabet.sigma_star(), rule.compile(alphabet)?])),
            RuleKind::SpellingExpansion { names, delimiters } => {
                let tau = closure(string_map(names.iter().map(|(a, b)| (a.as_str(), b.as_str()))), 2, Some(4));
                let delimiters: Vec<Label> = delimiters.iter().map(|&c| c as Label).collect();
                let left: Vec<Label> = delimiters.iter().copied().chain([BOS]).collect();
                let right: Vec<Label> = delimiters.iter().copied().chain([EOS]).collect();
                RewriteRule::new(tau)
                    .left(Context::labels(&left))
                    .right(Context::labels(&right))
                    .compile(alphabet)
            }
        }
    }
}
