// Connect, epsilon removal, weighted determinization, weight pushing and
// minimization.
//
// `optimize` chains them the way every cascade stage and compiled rule is
// cleaned up. Each pass preserves the weighted (input, output) relation.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::MAX_DETERMINIZED_STATES;
use crate::fst::{Fst, StateId};
use crate::paths::shortest_distance;
use crate::symbols::Label;
use crate::transition::Transition;
use crate::weight::Weight;

/// Remove states that are not reachable from the start state or that cannot
/// reach a final state. A machine whose start state is removed becomes empty.
pub fn connect(fst: &mut Fst) {
    let Some(start) = fst.start() else {
        fst.clear();
        return;
    };
    let n = fst.num_states();

    let mut accessible = vec![false; n];
    let mut stack = vec![start];
    accessible[start as usize] = true;
    let mut reverse: Vec<Vec<StateId>> = vec![Vec::new(); n];
    while let Some(state) = stack.pop() {
        for t in fst.transitions(state) {
            reverse[t.target_state as usize].push(state);
            if !accessible[t.target_state as usize] {
                accessible[t.target_state as usize] = true;
                stack.push(t.target_state);
            }
        }
    }

    let mut coaccessible = vec![false; n];
    for state in fst.states() {
        if accessible[state as usize] && fst.is_final(state) {
            coaccessible[state as usize] = true;
            stack.push(state);
        }
    }
    while let Some(state) = stack.pop() {
        for &source in &reverse[state as usize] {
            if !coaccessible[source as usize] {
                coaccessible[source as usize] = true;
                stack.push(source);
            }
        }
    }

    if !coaccessible[start as usize] {
        fst.clear();
        return;
    }
    let keep: Vec<bool> = (0..n).map(|i| accessible[i] && coaccessible[i]).collect();
    if keep.iter().all(|&k| k) {
        return;
    }
    fst.retain_states(&keep);
}

/// Epsilon closure of `state`: every state reachable through transitions that
/// are epsilon on both tapes, with the best distance, in discovery order.
fn epsilon_closure(fst: &Fst, state: StateId) -> Vec<(StateId, Weight)> {
    let mut order = vec![state];
    let mut distance: HashMap<StateId, Weight> = HashMap::new();
    distance.insert(state, Weight::ONE);
    let mut queue = VecDeque::from([state]);
    let mut queued: HashSet<StateId> = HashSet::from([state]);

    while let Some(q) = queue.pop_front() {
        queued.remove(&q);
        let dq = distance[&q];
        for t in fst.transitions(q).iter().filter(|t| t.is_epsilon()) {
            let candidate = dq.times(t.weight);
            let improved = match distance.get(&t.target_state) {
                Some(&d) => candidate < d,
                None => {
                    order.push(t.target_state);
                    true
                }
            };
            if improved {
                distance.insert(t.target_state, candidate);
                if queued.insert(t.target_state) {
                    queue.push_back(t.target_state);
                }
            }
        }
    }

    order.into_iter().map(|s| (s, distance[&s])).collect()
}

/// Remove transitions that are epsilon on both tapes.
///
/// Each state receives the non-epsilon transitions and final weights of its
/// epsilon closure, weighted by the closure distance.
pub fn rm_epsilon(fst: &mut Fst) {
    let has_epsilon = fst
        .states()
        .any(|s| fst.transitions(s).iter().any(Transition::is_epsilon));
    if !has_epsilon {
        return;
    }

    let mut new_transitions: Vec<Vec<Transition>> = Vec::with_capacity(fst.num_states());
    let mut new_finals: Vec<Weight> = Vec::with_capacity(fst.num_states());
    for state in fst.states() {
        let mut transitions = Vec::new();
        let mut final_weight = Weight::ZERO;
        for (reached, distance) in epsilon_closure(fst, state) {
            final_weight = final_weight.plus(distance.times(fst.final_weight(reached)));
            for t in fst.transitions(reached).iter().filter(|t| !t.is_epsilon()) {
                transitions.push(Transition::new(
                    t.sym_in,
                    t.sym_out,
                    distance.times(t.weight),
                    t.target_state,
                ));
            }
        }
        new_transitions.push(transitions);
        new_finals.push(final_weight);
    }

    for (state, (transitions, final_weight)) in
        fst.states().zip(new_transitions.into_iter().zip(new_finals))
    {
        *fst.transitions_mut(state) = transitions;
        fst.set_final(state, final_weight);
    }
    connect(fst);
}

/// A determinized state: original states with their residual weights,
/// sorted by state id.
type Subset = Vec<(StateId, Weight)>;

fn subset_key(subset: &Subset) -> Vec<(StateId, i64)> {
    subset.iter().map(|&(s, w)| (s, w.quantize())).collect()
}

/// Weighted subset construction over `(input, output)` label pairs.
///
/// Expects an epsilon-free machine. Returns `None` once more than
/// `max_states` states would be created; the input is left untouched.
pub fn determinize(fst: &Fst, max_states: usize) -> Option<Fst> {
    let mut result = Fst::like(fst);
    let Some(start) = fst.start() else {
        return Some(result);
    };

    let mut ids: HashMap<Vec<(StateId, i64)>, StateId> = HashMap::new();
    let mut subsets: Vec<Subset> = Vec::new();

    let initial: Subset = vec![(start, Weight::ONE)];
    ids.insert(subset_key(&initial), result.add_state());
    subsets.push(initial);
    result.set_start(0);

    let mut next = 0usize;
    while next < subsets.len() {
        let subset = subsets[next].clone();
        let source = next as StateId;
        next += 1;

        let final_weight = subset
            .iter()
            .fold(Weight::ZERO, |acc, &(s, r)| acc.plus(r.times(fst.final_weight(s))));
        result.set_final(source, final_weight);

        let mut groups: BTreeMap<(Label, Label), Vec<(Weight, StateId)>> = BTreeMap::new();
        for &(state, residual) in &subset {
            for t in fst.transitions(state) {
                groups
                    .entry((t.sym_in, t.sym_out))
                    .or_default()
                    .push((residual.times(t.weight), t.target_state));
            }
        }

        for ((sym_in, sym_out), members) in groups {
            let weight = members.iter().fold(Weight::ZERO, |acc, &(w, _)| acc.plus(w));
            let mut merged: BTreeMap<StateId, Weight> = BTreeMap::new();
            for (w, target) in members {
                let residual = w.divide(weight);
                merged
                    .entry(target)
                    .and_modify(|r| *r = r.plus(residual))
                    .or_insert(residual);
            }
            let target_subset: Subset = merged.into_iter().collect();
            let key = subset_key(&target_subset);
            let target = match ids.get(&key) {
                Some(&id) => id,
                None => {
                    if subsets.len() >= max_states {
                        return None;
                    }
                    let id = result.add_state();
                    ids.insert(key, id);
                    subsets.push(target_subset);
                    id
                }
            };
            result.add_transition(source, Transition::new(sym_in, sym_out, weight, target));
        }
    }

    Some(result)
}

/// Push weights toward the start state.
///
/// Every state's distance to a final state becomes one, and the total weight
/// of the best path is carried by a fresh start state. Non-coaccessible
/// states must be removed first.
pub fn push_weights(fst: &mut Fst) {
    let Some(start) = fst.start() else {
        return;
    };
    let distance = shortest_distance(fst, true);
    if distance[start as usize].is_zero() {
        return;
    }

    for state in fst.states() {
        let d = distance[state as usize];
        if d.is_zero() {
            continue;
        }
        for t in fst.transitions_mut(state).iter_mut() {
            t.weight = t.weight.times(distance[t.target_state as usize]).divide(d);
        }
        let final_weight = fst.final_weight(state);
        if !final_weight.is_zero() {
            fst.set_final(state, final_weight.divide(d));
        }
    }

    let total = distance[start as usize];
    if total.is_one() {
        return;
    }
    let new_start = fst.add_state();
    let transitions: Vec<Transition> = fst
        .transitions(start)
        .iter()
        .map(|t| Transition::new(t.sym_in, t.sym_out, total.times(t.weight), t.target_state))
        .collect();
    for t in transitions {
        fst.add_transition(new_start, t);
    }
    fst.set_final(new_start, total.times(fst.final_weight(start)));
    fst.set_start(new_start);
}

/// Signature of a state's outgoing behavior under a partition.
type Signature = (u32, Vec<(Label, Label, i64, u32)>);

/// Merge states that are indistinguishable under the current weights.
///
/// Moore-style partition refinement starting from classes of equal (quantized)
/// final weight. Two states end in the same class when their outgoing
/// `(input, output, weight, target class)` sets coincide.
pub fn minimize(fst: &mut Fst) {
    let Some(start) = fst.start() else {
        return;
    };
    let n = fst.num_states();

    let mut class: Vec<u32> = {
        let mut by_final: HashMap<i64, u32> = HashMap::new();
        fst.states()
            .map(|s| {
                let key = fst.final_weight(s).quantize();
                let next = by_final.len() as u32;
                *by_final.entry(key).or_insert(next)
            })
            .collect()
    };
    let mut class_count = class.iter().max().map_or(0, |&c| c as usize + 1);

    loop {
        let mut ids: HashMap<Signature, u32> = HashMap::new();
        let refined: Vec<u32> = fst
            .states()
            .map(|s| {
                let mut arcs: Vec<(Label, Label, i64, u32)> = fst
                    .transitions(s)
                    .iter()
                    .map(|t| (t.sym_in, t.sym_out, t.weight.quantize(), class[t.target_state as usize]))
                    .collect();
                arcs.sort_unstable();
                arcs.dedup();
                let next = ids.len() as u32;
                *ids.entry((class[s as usize], arcs)).or_insert(next)
            })
            .collect();
        let refined_count = ids.len();
        class = refined;
        if refined_count == class_count {
            break;
        }
        class_count = refined_count;
    }

    if class_count == n {
        return;
    }

    let mut representative: Vec<Option<StateId>> = vec![None; class_count];
    for state in fst.states() {
        representative[class[state as usize] as usize].get_or_insert(state);
    }

    let mut quotient = Fst::like(fst);
    for _ in 0..class_count {
        quotient.add_state();
    }
    for (c, rep) in representative.iter().enumerate() {
        let Some(rep) = *rep else { continue };
        let c = c as StateId;
        quotient.set_final(c, fst.final_weight(rep));
        let mut seen: HashSet<(Label, Label, i64, u32)> = HashSet::new();
        for t in fst.transitions(rep) {
            let target = class[t.target_state as usize];
            if seen.insert((t.sym_in, t.sym_out, t.weight.quantize(), target)) {
                quotient.add_transition(c, Transition::new(t.sym_in, t.sym_out, t.weight, target));
            }
        }
    }
    quotient.set_start(class[start as usize]);
    *fst = quotient;
}

/// Full cleanup pass: connect, epsilon removal, determinization (capped at
/// [`MAX_DETERMINIZED_STATES`]), weight pushing, minimization and input-label
/// sorting.
pub fn optimize(fst: &mut Fst) {
    optimize_with_cap(fst, MAX_DETERMINIZED_STATES);
}

/// [`optimize`] with an explicit determinization state cap.
pub fn optimize_with_cap(fst: &mut Fst, max_states: usize) {
    connect(fst);
    if fst.is_empty() {
        return;
    }
    let before = (fst.num_states(), fst.num_transitions());
    rm_epsilon(fst);
    match determinize(fst, max_states) {
        Some(det) => *fst = det,
        None => warn!(
            max_states,
            states = fst.num_states(),
            "determinization state cap reached; keeping epsilon-free machine"
        ),
    }
    push_weights(fst);
    connect(fst);
    minimize(fst);
    fst.sort_transitions_by_input();
    debug!(
        states_before = before.0,
        transitions_before = before.1,
        states = fst.num_states(),
        transitions = fst.num_transitions(),
        "optimized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecodeConfig;
    use crate::algebra::{acceptor, concat, epsilon_machine, literal_cross, star, string_map, union};
    use crate::compose::compose;
    use crate::paths::n_shortest_paths;

    fn decode(fst: &Fst, input: &str) -> Vec<(String, f32)> {
        let lattice = compose(&acceptor(input), fst).unwrap();
        let config = DecodeConfig::default().with_n_best(8);
        n_shortest_paths(&lattice, &config)
            .into_iter()
            .map(|h| (h.text, h.weight))
            .collect()
    }

    fn weighted_map() -> Fst {
        union([
            literal_cross("ab", "x", Weight::new(1.0)),
            literal_cross("ab", "y", Weight::new(2.0)),
            literal_cross("ac", "x", Weight::new(0.5)),
            literal_cross("ac", "x", Weight::new(4.0)),
            star(literal_cross("d", "e", Weight::new(0.25))),
        ])
    }

    #[test]
    fn connect_removes_dead_states() {
        let mut fst = acceptor("ab");
        let dead = fst.add_state();
        fst.add_transition(0, Transition::identity('z' as Label, dead));
        connect(&mut fst);
        assert_eq!(fst.num_states(), 3);
        assert_eq!(fst.num_transitions(), 2);
    }

    #[test]
    fn connect_empties_machine_without_final_path() {
        let mut fst = acceptor("ab");
        fst.set_final(2, Weight::ZERO);
        connect(&mut fst);
        assert!(fst.is_empty());
        assert_eq!(fst.num_states(), 0);
    }

    #[test]
    fn rm_epsilon_removes_all_epsilons() {
        let mut fst = concat(epsilon_machine(), concat(acceptor("a"), star(acceptor("b"))));
        rm_epsilon(&mut fst);
        assert!(fst.states().all(|s| fst.transitions(s).iter().all(|t| !t.is_epsilon())));
        assert_eq!(decode(&fst, "abb"), vec![("abb".to_string(), 0.0)]);
        assert_eq!(decode(&fst, "a"), vec![("a".to_string(), 0.0)]);
    }

    #[test]
    fn determinize_keeps_best_weights() {
        let mut fst = weighted_map();
        rm_epsilon(&mut fst);
        let det = determinize(&fst, usize::MAX).unwrap();
        for state in det.states() {
            let mut pairs: Vec<_> = det.transitions(state).iter().map(|t| (t.sym_in, t.sym_out)).collect();
            let len = pairs.len();
            pairs.sort_unstable();
            pairs.dedup();
            assert_eq!(pairs.len(), len);
        }
        assert_eq!(decode(&det, "ac"), vec![("x".to_string(), 0.5)]);
    }

    #[test]
    fn determinize_respects_cap() {
        let mut fst = weighted_map();
        rm_epsilon(&mut fst);
        assert!(determinize(&fst, 1).is_none());
    }

    #[test]
    fn optimize_preserves_relation() {
        let fst = weighted_map();
        let mut optimized = fst.clone();
        optimize(&mut optimized);
        for input in ["ab", "ac", "", "ddd", "ad"] {
            assert_eq!(decode(&fst, input), decode(&optimized, input), "input {input:?}");
        }
        assert!(optimized.num_states() <= fst.num_states());
        assert!(optimized.is_input_sorted());
    }

    #[test]
    fn optimize_with_tiny_cap_still_correct() {
        let fst = weighted_map();
        let mut optimized = fst.clone();
        optimize_with_cap(&mut optimized, 1);
        assert_eq!(decode(&optimized, "ab"), decode(&fst, "ab"));
    }

    #[test]
    fn minimize_merges_equivalent_tails() {
        let mut fst = string_map([("ka", "ka"), ("ta", "ta"), ("pa", "pa")]);
        optimize(&mut fst);
        // start, one state after the consonant, one final state
        assert_eq!(fst.num_states(), 3);
    }

    #[test]
    fn push_weights_moves_cost_to_start() {
        let mut fst = literal_cross("abc", "abc", Weight::ONE);
        fst.set_final(3, Weight::new(2.0));
        push_weights(&mut fst);
        let start = fst.start().unwrap();
        assert_eq!(fst.transitions(start)[0].weight, Weight::new(2.0));
        assert_eq!(decode(&fst, "abc"), vec![("abc".to_string(), 2.0)]);
    }
}
