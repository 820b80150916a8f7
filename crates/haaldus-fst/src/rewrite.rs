// Context-dependent rewrite rule compiler.
//
// A rule `tau / left _ right` is compiled into a single transducer by the
// marker construction: boundary symbols are inserted around the input,
// candidate sites are bracketed, bracketings that violate the contexts or
// the leftmost-longest discipline are filtered out, bracketed sites are
// replaced by `tau`, and finally brackets and boundaries are deleted.
// Contexts are matched against the rule's input string.

use crate::FstError;
use crate::algebra::{
    ProjectSide, concat, concat_all, difference, epsilon_machine, erase_weights, ignore_labels,
    intersect, label_cross, label_set, label_star, project, star, union,
};
use crate::compose::compose;
use crate::fst::Fst;
use crate::optimize::optimize;
use crate::symbols::{Alphabet, EPSILON, FIRST_MARKER_LABEL, Label};
use crate::weight::Weight;

/// Beginning-of-string boundary, usable inside contexts.
pub const BOS: Label = FIRST_MARKER_LABEL;
/// End-of-string boundary, usable inside contexts.
pub const EOS: Label = FIRST_MARKER_LABEL + 1;
const OPEN: Label = FIRST_MARKER_LABEL + 2;
const CLOSE: Label = FIRST_MARKER_LABEL + 3;

/// How candidate sites are rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RewriteMode {
    /// Every eligible site is rewritten, choosing leftmost-longest
    /// non-overlapping matches.
    #[default]
    Obligatory,
    /// Any subset of non-overlapping eligible sites is rewritten, including
    /// none.
    Optional,
}

/// A left or right context: an acceptor over the alphabet plus the
/// [`BOS`]/[`EOS`] boundaries.
///
/// A left context matches when the input before a site ends with one of its
/// strings; a right context when the input after a site starts with one.
#[derive(Debug, Clone)]
pub struct Context(Fst);

impl Context {
    /// No constraint.
    pub fn any() -> Self {
        Self(epsilon_machine())
    }

    /// The site touches the start of the string.
    pub fn bos() -> Self {
        Self(label_set(&[BOS]))
    }

    /// The site touches the end of the string.
    pub fn eos() -> Self {
        Self(label_set(&[EOS]))
    }

    /// Exactly one character out of `chars`.
    pub fn chars(chars: &str) -> Self {
        let labels: Vec<Label> = chars.chars().map(|c| c as Label).collect();
        Self(label_set(&labels))
    }

    /// Exactly one label out of `labels`, which may include [`BOS`] and
    /// [`EOS`].
    pub fn labels(labels: &[Label]) -> Self {
        Self(label_set(labels))
    }

    /// Exactly the string `s`.
    pub fn literal(s: &str) -> Self {
        Self(crate::algebra::acceptor(s))
    }

    pub fn from_fst(fst: Fst) -> Self {
        Self(fst)
    }

    /// Either context.
    pub fn or(self, other: Context) -> Self {
        Self(union([self.0, other.0]))
    }

    /// This context followed by `other`.
    pub fn then(self, other: Context) -> Self {
        Self(concat(self.0, other.0))
    }

    pub fn fst(&self) -> &Fst {
        &self.0
    }
}

impl From<Fst> for Context {
    fn from(fst: Fst) -> Self {
        Self(fst)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::any()
    }
}

/// A rewrite rule `tau / left _ right`.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    tau: Fst,
    left: Context,
    right: Context,
    mode: RewriteMode,
}

impl RewriteRule {
    /// Obligatory rule with no context constraints.
    pub fn new(tau: Fst) -> Self {
        Self {
            tau,
            left: Context::any(),
            right: Context::any(),
            mode: RewriteMode::Obligatory,
        }
    }

    pub fn left(mut self, context: impl Into<Context>) -> Self {
        self.left = context.into();
        self
    }

    pub fn right(mut self, context: impl Into<Context>) -> Self {
        self.right = context.into();
        self
    }

    pub fn mode(mut self, mode: RewriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_optional(&self) -> bool {
        self.mode == RewriteMode::Optional
    }

    /// Compile the rule into a transducer over `alphabet`.
    ///
    /// Strings in `tau`'s domain are matched leftmost-longest without
    /// overlap. The empty string is removed from the domain; a `tau` with an
    /// empty remaining domain compiles to the identity.
    pub fn compile(&self, alphabet: &Alphabet) -> Result<Fst, FstError> {
        if !self.left.0.is_acceptor() || !self.right.0.is_acceptor() {
            return Err(FstError::NotAnAcceptor("rewrite context"));
        }
        let labels = LabelSets::new(alphabet, &self.tau);

        let mut domain = self.tau.clone();
        project(&mut domain, ProjectSide::Input);
        erase_weights(&mut domain);
        optimize(&mut domain);
        let mut phi = difference(&domain, &epsilon_machine())?;
        optimize(&mut phi);
        if phi.is_empty() {
            return Ok(alphabet.sigma_star());
        }
        let mut tau = compose(&phi, &self.tau)?;
        optimize(&mut tau);

        let filter = self.filter(&phi, &labels)?;

        let identity = label_set(&labels.bounded);
        let bracketer = star(union([
            identity.clone(),
            concat_all([
                label_cross(EPSILON, OPEN, Weight::ONE),
                phi,
                label_cross(EPSILON, CLOSE, Weight::ONE),
            ]),
        ]));
        let replacer = star(union([
            identity,
            concat_all([
                label_cross(OPEN, EPSILON, Weight::ONE),
                tau,
                label_cross(CLOSE, EPSILON, Weight::ONE),
            ]),
        ]));
        let insert_bounds = concat_all([
            label_cross(EPSILON, BOS, Weight::ONE),
            label_star(&labels.sigma),
            label_cross(EPSILON, EOS, Weight::ONE),
        ]);
        let remove_bounds = concat_all([
            label_cross(BOS, EPSILON, Weight::ONE),
            label_star(&labels.output),
            label_cross(EOS, EPSILON, Weight::ONE),
        ]);

        let mut rule = insert_bounds;
        for stage in [bracketer, filter, replacer, remove_bounds] {
            rule = compose(&rule, &stage)?;
            optimize(&mut rule);
        }
        Ok(rule)
    }

    /// Acceptor over bracketed strings keeping only the bracketings that this
    /// rule's contexts and mode allow.
    fn filter(&self, phi: &Fst, labels: &LabelSets) -> Result<Fst, FstError> {
        let gamma_star = || label_star(&labels.all);
        let bounded_star = || label_star(&labels.bounded);
        let brackets = [OPEN, CLOSE];

        let mut left = concat(bounded_star(), self.left.0.clone());
        ignore_labels(&mut left, &brackets);
        let mut right = concat(self.right.0.clone(), bounded_star());
        ignore_labels(&mut right, &brackets);

        let mut bad = vec![
            concat_all([difference(&gamma_star(), &left)?, label_set(&[OPEN]), gamma_star()]),
            concat_all([gamma_star(), label_set(&[CLOSE]), difference(&gamma_star(), &right)?]),
        ];

        if self.mode == RewriteMode::Obligatory {
            let mut phi_ignoring = phi.clone();
            ignore_labels(&mut phi_ignoring, &brackets);

            // An unbracketed match in context that starts outside any bracket.
            let inside = concat_all([gamma_star(), label_set(&[OPEN]), bounded_star()]);
            let outside = difference(&gamma_star(), &inside)?;
            let unbracketed = concat(label_set(&labels.sigma), gamma_star());
            bad.push(concat_all([
                intersect(&outside, &left)?,
                intersect(&phi_ignoring, &unbracketed)?,
                right.clone(),
            ]));

            // A bracket that closes before a longer match from the same start.
            let extends = concat_all([
                bounded_star(),
                label_set(&[CLOSE]),
                gamma_star(),
                label_set(&labels.bounded),
                gamma_star(),
            ]);
            bad.push(concat_all([
                gamma_star(),
                label_set(&[OPEN]),
                intersect(&phi_ignoring, &extends)?,
                right,
            ]));
        }

        let mut filter = difference(&gamma_star(), &union(bad))?;
        optimize(&mut filter);
        Ok(filter)
    }
}

/// Compile `tau / left _ right` in one call.
pub fn cdrewrite(
    tau: Fst,
    left: Context,
    right: Context,
    alphabet: &Alphabet,
    mode: RewriteMode,
) -> Result<Fst, FstError> {
    RewriteRule::new(tau).left(left).right(right).mode(mode).compile(alphabet)
}

/// Label sets used by the construction.
struct LabelSets {
    /// The alphabet.
    sigma: Vec<Label>,
    /// The alphabet plus boundaries.
    bounded: Vec<Label>,
    /// The alphabet plus boundaries and brackets.
    all: Vec<Label>,
    /// The alphabet plus every non-marker label `tau` can emit.
    output: Vec<Label>,
}

impl LabelSets {
    fn new(alphabet: &Alphabet, tau: &Fst) -> Self {
        let sigma = alphabet.labels();
        let mut bounded = sigma.clone();
        bounded.extend([BOS, EOS]);
        let mut all = bounded.clone();
        all.extend([OPEN, CLOSE]);

        let mut output = sigma.clone();
        output.extend(
            tau.states()
                .flat_map(|s| tau.transitions(s).iter().map(|t| t.sym_out))
                .filter(|&l| l != EPSILON && l < FIRST_MARKER_LABEL),
        );
        output.sort_unstable();
        output.dedup();

        Self {
            sigma,
            bounded,
            all,
            output,
        }
    }
}
