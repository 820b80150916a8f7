// Construction algebra: literal machines, union, concatenation, closure,
// projection, inversion, intersection, difference and relabeling.
//
// Operands are moved in; callers clone a machine to use it twice.

use crate::FstError;
use crate::compose::compose;
use crate::fst::{Fst, StateId};
use crate::optimize::{determinize, rm_epsilon};
use crate::symbols::{EPSILON, Label, SymbolSpace};
use crate::transition::Transition;
use crate::weight::Weight;

/// Which tape of a transducer an operation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectSide {
    Input,
    Output,
}

/// Linear identity acceptor for `s` over UTF-8 labels.
pub fn acceptor(s: &str) -> Fst {
    let labels: Vec<Label> = s.chars().map(|c| c as Label).collect();
    label_string(&labels, &labels, Weight::ONE)
}

/// Minimal linear transducer mapping exactly `a` to `b` with `weight`.
///
/// The shorter side is padded with epsilon at its end.
pub fn literal_cross(a: &str, b: &str, weight: Weight) -> Fst {
    let input: Vec<Label> = a.chars().map(|c| c as Label).collect();
    let output: Vec<Label> = b.chars().map(|c| c as Label).collect();
    label_string(&input, &output, weight)
}

/// Union of literal crosses, one per pair.
pub fn string_map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Fst {
    union(pairs.into_iter().map(|(a, b)| literal_cross(a, b, Weight::ONE)))
}

/// Machine accepting only the empty string.
pub fn epsilon_machine() -> Fst {
    let mut fst = Fst::new();
    let state = fst.add_state();
    fst.set_start(state);
    fst.set_final(state, Weight::ONE);
    fst
}

/// Single transition `sym_in:sym_out/weight`.
pub fn label_cross(sym_in: Label, sym_out: Label, weight: Weight) -> Fst {
    label_string(&[sym_in], &[sym_out], weight)
}

/// Acceptor for exactly one label out of `labels`.
pub fn label_set(labels: &[Label]) -> Fst {
    let mut fst = Fst::new();
    let start = fst.add_state();
    let end = fst.add_state();
    fst.set_start(start);
    fst.set_final(end, Weight::ONE);
    for &label in labels {
        fst.add_transition(start, Transition::identity(label, end));
    }
    fst
}

/// Acceptor for any string over `labels`, including the empty one.
pub fn label_star(labels: &[Label]) -> Fst {
    let mut fst = Fst::new();
    let state = fst.add_state();
    fst.set_start(state);
    fst.set_final(state, Weight::ONE);
    for &label in labels {
        fst.add_transition(state, Transition::identity(label, state));
    }
    fst
}

fn label_string(input: &[Label], output: &[Label], weight: Weight) -> Fst {
    let mut fst = Fst::new();
    let mut state = fst.add_state();
    fst.set_start(state);
    let len = input.len().max(output.len());
    for i in 0..len {
        let next = fst.add_state();
        let sym_in = input.get(i).copied().unwrap_or(EPSILON);
        let sym_out = output.get(i).copied().unwrap_or(EPSILON);
        let w = if i == 0 { weight } else { Weight::ONE };
        fst.add_transition(state, Transition::new(sym_in, sym_out, w, next));
        state = next;
    }
    let final_weight = if len == 0 { weight } else { Weight::ONE };
    fst.set_final(state, final_weight);
    fst
}

/// Union of any number of machines.
///
/// A fresh start state gets an epsilon transition into each operand's start.
/// Operands without a start state contribute nothing. The result takes its
/// symbol spaces from the first operand.
pub fn union(operands: impl IntoIterator<Item = Fst>) -> Fst {
    let mut operands = operands.into_iter().filter(|f| !f.is_empty()).peekable();
    let mut result = match operands.peek() {
        Some(first) => Fst::like(first),
        None => return Fst::new(),
    };
    let start = result.add_state();
    result.set_start(start);
    for operand in operands {
        let Some(operand_start) = operand.start() else {
            continue;
        };
        let offset = result.append_states(operand);
        result.add_transition(start, Transition::epsilon(Weight::ONE, operand_start + offset));
    }
    result
}

/// Sequential concatenation: `a` followed by `b`.
pub fn concat(mut a: Fst, b: Fst) -> Fst {
    let (Some(_), Some(b_start)) = (a.start(), b.start()) else {
        let mut empty = Fst::like(&a);
        empty.set_output_space(b.output_space().clone());
        return empty;
    };
    let output_space = b.output_space().clone();
    let a_states = a.num_states() as StateId;
    let offset = a.append_states(b);
    for state in 0..a_states {
        let final_weight = a.final_weight(state);
        if final_weight.is_zero() {
            continue;
        }
        a.set_final(state, Weight::ZERO);
        a.add_transition(state, Transition::epsilon(final_weight, b_start + offset));
    }
    a.set_output_space(output_space);
    a
}

/// Concatenate every machine in order. An empty list yields the empty-string
/// machine.
pub fn concat_all(parts: impl IntoIterator<Item = Fst>) -> Fst {
    parts.into_iter().fold(epsilon_machine(), concat)
}

/// Kleene star: zero or more repetitions.
pub fn star(mut fst: Fst) -> Fst {
    let Some(old_start) = fst.start() else {
        return epsilon_machine();
    };
    let finals: Vec<(StateId, Weight)> = fst
        .states()
        .filter(|&s| fst.is_final(s))
        .map(|s| (s, fst.final_weight(s)))
        .collect();
    let start = fst.add_state();
    for (state, weight) in finals {
        fst.set_final(state, Weight::ZERO);
        fst.add_transition(state, Transition::epsilon(weight, start));
    }
    fst.add_transition(start, Transition::epsilon(Weight::ONE, old_start));
    fst.set_final(start, Weight::ONE);
    fst.set_start(start);
    fst
}

/// Bounded or unbounded closure.
///
/// Exactly `min` copies are concatenated, followed by a star when `max` is
/// `None`, or by `max - min` nested optional copies otherwise. A bounded
/// closure of an acyclic machine stays acyclic. `max < min` accepts nothing.
pub fn closure(fst: Fst, min: usize, max: Option<usize>) -> Fst {
    let prefix = concat_all(std::iter::repeat_n(fst.clone(), min));
    match max {
        None => concat(prefix, star(fst)),
        Some(max) if max < min => Fst::like(&fst),
        Some(max) => {
            let mut tail = epsilon_machine();
            for _ in min..max {
                tail = union([epsilon_machine(), concat(fst.clone(), tail)]);
            }
            concat(prefix, tail)
        }
    }
}

/// `fst` or the empty string.
pub fn optional(fst: Fst) -> Fst {
    closure(fst, 0, Some(1))
}

/// Replace one tape by the other, turning the machine into an acceptor.
pub fn project(fst: &mut Fst, side: ProjectSide) {
    match side {
        ProjectSide::Input => {
            fst.map_transitions(|t| t.sym_out = t.sym_in);
            fst.set_output_space(fst.input_space().clone());
        }
        ProjectSide::Output => {
            fst.map_transitions(|t| t.sym_in = t.sym_out);
            fst.set_input_space(fst.output_space().clone());
        }
    }
}

/// Swap input and output labels on every transition.
pub fn invert(fst: &mut Fst) {
    fst.map_transitions(|t| std::mem::swap(&mut t.sym_in, &mut t.sym_out));
    let input = fst.input_space().clone();
    let output = fst.output_space().clone();
    fst.set_input_space(output);
    fst.set_output_space(input);
}

/// Intersection of two acceptors.
pub fn intersect(a: &Fst, b: &Fst) -> Result<Fst, FstError> {
    if !a.is_acceptor() || !b.is_acceptor() {
        return Err(FstError::NotAnAcceptor("intersect"));
    }
    compose(a, b)
}

/// Strings of `a` that `b` does not accept, with `a`'s weights.
pub fn difference(a: &Fst, b: &Fst) -> Result<Fst, FstError> {
    if !a.is_acceptor() || !b.is_acceptor() {
        return Err(FstError::NotAnAcceptor("difference"));
    }
    if a.is_empty() {
        return Ok(a.clone());
    }
    let mut labels: Vec<Label> = a
        .states()
        .flat_map(|s| a.transitions(s).iter().map(|t| t.sym_in))
        .filter(|&l| l != EPSILON)
        .collect();
    labels.sort_unstable();
    labels.dedup();

    let complement = complement(b, &labels);
    compose(a, &complement)
}

/// Unweighted complement of acceptor `b` relative to `labels*`.
fn complement(b: &Fst, labels: &[Label]) -> Fst {
    let mut det = b.clone();
    erase_weights(&mut det);
    rm_epsilon(&mut det);
    let mut det = match determinize(&det, usize::MAX) {
        Some(d) => d,
        None => det,
    };
    if det.is_empty() {
        let start = det.add_state();
        det.set_start(start);
    }

    let sink = det.add_state();
    for state in det.states() {
        let mut present: Vec<Label> = det.transitions(state).iter().map(|t| t.sym_in).collect();
        present.sort_unstable();
        for &label in labels {
            if present.binary_search(&label).is_err() {
                det.add_transition(state, Transition::identity(label, sink));
            }
        }
        let flipped = if det.is_final(state) { Weight::ZERO } else { Weight::ONE };
        det.set_final(state, flipped);
    }
    det
}

/// Set every transition and final weight to [`Weight::ONE`].
pub fn erase_weights(fst: &mut Fst) {
    fst.map_transitions(|t| t.weight = Weight::ONE);
    for state in fst.states() {
        if fst.is_final(state) {
            fst.set_final(state, Weight::ONE);
        }
    }
}

/// Relabel one tape into `space`.
///
/// `f` maps each non-epsilon label on that tape; `None` fails with
/// [`FstError::UnknownLabel`].
pub fn map_symbols(
    fst: &mut Fst,
    side: ProjectSide,
    space: SymbolSpace,
    f: impl Fn(Label) -> Option<Label>,
) -> Result<(), FstError> {
    for state in fst.states() {
        for t in fst.transitions_mut(state).iter_mut() {
            let label = match side {
                ProjectSide::Input => &mut t.sym_in,
                ProjectSide::Output => &mut t.sym_out,
            };
            if *label != EPSILON {
                *label = f(*label).ok_or(FstError::UnknownLabel(*label))?;
            }
        }
    }
    match side {
        ProjectSide::Input => fst.set_input_space(space),
        ProjectSide::Output => fst.set_output_space(space),
    }
    Ok(())
}

/// Add self-loops for `labels` on every state, so the machine ignores those
/// labels wherever they occur.
pub fn ignore_labels(fst: &mut Fst, labels: &[Label]) {
    for state in fst.states() {
        for &label in labels {
            fst.add_transition(state, Transition::identity(label, state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecodeConfig;
    use crate::paths::n_shortest_paths;

    fn outputs(fst: &Fst, input: &str) -> Vec<(String, f32)> {
        let lattice = compose(&acceptor(input), fst).unwrap();
        let config = DecodeConfig::default().with_n_best(16);
        n_shortest_paths(&lattice, &config)
            .into_iter()
            .map(|h| (h.text, h.weight))
            .collect()
    }

    fn accepts(fst: &Fst, input: &str) -> bool {
        !outputs(fst, input).is_empty()
    }

    #[test]
    fn literal_cross_pads_shorter_side() {
        let fst = literal_cross("ch", "tš", Weight::new(0.5));
        assert_eq!(fst.num_transitions(), 2);
        assert_eq!(outputs(&fst, "ch"), vec![("tš".to_string(), 0.5)]);

        let shorter = literal_cross("x", "ks", Weight::ONE);
        assert_eq!(shorter.transitions(1)[0].sym_in, EPSILON);
        assert_eq!(outputs(&shorter, "x"), vec![("ks".to_string(), 0.0)]);
    }

    #[test]
    fn empty_cross_is_weighted_final_start() {
        let fst = literal_cross("", "", Weight::new(2.0));
        assert_eq!(fst.num_states(), 1);
        assert_eq!(fst.final_weight(0), Weight::new(2.0));
    }

    #[test]
    fn union_of_string_map() {
        let fst = string_map([("a", "x"), ("a", "y"), ("b", "z")]);
        let mut a = outputs(&fst, "a");
        a.sort_by(|l, r| l.0.cmp(&r.0));
        assert_eq!(a, vec![("x".to_string(), 0.0), ("y".to_string(), 0.0)]);
        assert_eq!(outputs(&fst, "b"), vec![("z".to_string(), 0.0)]);
        assert!(!accepts(&fst, "c"));
    }

    #[test]
    fn union_skips_empty_operands() {
        let fst = union([Fst::new(), acceptor("a")]);
        assert!(accepts(&fst, "a"));
        assert!(union(Vec::new()).is_empty());
    }

    #[test]
    fn concat_carries_final_weight() {
        let a = literal_cross("a", "a", Weight::ONE);
        let mut b = acceptor("b");
        b.set_final(1, Weight::new(1.0));
        let mut first = acceptor("x");
        first.set_final(1, Weight::new(2.0));
        let fst = concat(first, concat(a, b));
        assert_eq!(outputs(&fst, "xab"), vec![("xab".to_string(), 3.0)]);
        assert!(!accepts(&fst, "x"));
    }

    #[test]
    fn star_accepts_repetitions() {
        let fst = star(acceptor("ab"));
        assert!(accepts(&fst, ""));
        assert!(accepts(&fst, "ab"));
        assert!(accepts(&fst, "ababab"));
        assert!(!accepts(&fst, "aba"));
    }

    #[test]
    fn bounded_closure() {
        let fst = closure(acceptor("a"), 2, Some(4));
        assert!(!accepts(&fst, "a"));
        assert!(accepts(&fst, "aa"));
        assert!(accepts(&fst, "aaaa"));
        assert!(!accepts(&fst, "aaaaa"));

        let plus = closure(acceptor("a"), 1, None);
        assert!(!accepts(&plus, ""));
        assert!(accepts(&plus, "aaaaaaa"));

        assert!(closure(acceptor("a"), 3, Some(1)).is_empty());
    }

    #[test]
    fn project_and_invert() {
        let mut fst = literal_cross("ab", "xy", Weight::ONE);
        invert(&mut fst);
        assert_eq!(outputs(&fst, "xy"), vec![("ab".to_string(), 0.0)]);
        invert(&mut fst);
        assert_eq!(outputs(&fst, "ab"), vec![("xy".to_string(), 0.0)]);

        let mut out = fst.clone();
        project(&mut out, ProjectSide::Output);
        assert!(out.is_acceptor());
        assert!(accepts(&out, "xy"));
        assert!(!accepts(&out, "ab"));
    }

    #[test]
    fn intersect_requires_acceptors() {
        let err = intersect(&literal_cross("a", "b", Weight::ONE), &acceptor("a")).unwrap_err();
        assert!(matches!(err, FstError::NotAnAcceptor("intersect")));

        let both = intersect(&union([acceptor("a"), acceptor("b")]), &acceptor("b")).unwrap();
        assert!(accepts(&both, "b"));
        assert!(!accepts(&both, "a"));
    }

    #[test]
    fn difference_removes_strings() {
        let all = label_star(&['a' as Label, 'b' as Label]);
        let diff = difference(&all, &union([acceptor("ab"), epsilon_machine()])).unwrap();
        assert!(!accepts(&diff, ""));
        assert!(!accepts(&diff, "ab"));
        assert!(accepts(&diff, "a"));
        assert!(accepts(&diff, "abab"));

        let err = difference(&literal_cross("a", "b", Weight::ONE), &all).unwrap_err();
        assert!(matches!(err, FstError::NotAnAcceptor("difference")));
    }

    #[test]
    fn difference_with_empty_subtrahend() {
        let diff = difference(&acceptor("a"), &Fst::new()).unwrap();
        assert!(accepts(&diff, "a"));
    }

    #[test]
    fn map_symbols_rejects_unknown() {
        let mut fst = acceptor("ab");
        let err = map_symbols(&mut fst, ProjectSide::Output, SymbolSpace::Utf8, |l| {
            (l == 'a' as Label).then_some(1)
        })
        .unwrap_err();
        assert!(matches!(err, FstError::UnknownLabel(98)));
    }
}
