// Arena-backed mutable weighted transducer.

use crate::symbols::{Label, SymbolSpace};
use crate::transition::Transition;
use crate::weight::Weight;

/// Index of a state in a transducer's state arena.
pub type StateId = u32;

#[derive(Debug, Clone, PartialEq)]
struct State {
    transitions: Vec<Transition>,
    final_weight: Weight,
}

impl State {
    fn new() -> Self {
        Self {
            transitions: Vec::new(),
            final_weight: Weight::ZERO,
        }
    }
}

/// A weighted finite-state transducer over the tropical semiring.
///
/// States live in an arena indexed by [`StateId`]; each state owns its
/// outgoing transitions. A transducer without a start state accepts nothing.
/// Acceptors are transducers whose transitions all carry equal input and
/// output labels.
#[derive(Clone, PartialEq)]
pub struct Fst {
    states: Vec<State>,
    start: Option<StateId>,
    input_space: SymbolSpace,
    output_space: SymbolSpace,
    /// Set while every state's transitions are sorted by input label.
    input_sorted: bool,
}

impl std::fmt::Debug for Fst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fst")
            .field("state_count", &self.states.len())
            .field("transition_count", &self.num_transitions())
            .field("start", &self.start)
            .field("input_space", &self.input_space.to_string())
            .field("output_space", &self.output_space.to_string())
            .finish()
    }
}

impl Default for Fst {
    fn default() -> Self {
        Self::new()
    }
}

impl Fst {
    /// Create an empty transducer over UTF-8 labels on both tapes.
    pub fn new() -> Self {
        Self::with_spaces(SymbolSpace::Utf8, SymbolSpace::Utf8)
    }

    pub fn with_spaces(input_space: SymbolSpace, output_space: SymbolSpace) -> Self {
        Self {
            states: Vec::new(),
            start: None,
            input_space,
            output_space,
            input_sorted: true,
        }
    }

    /// Create an empty transducer that shares `other`'s symbol spaces.
    pub fn like(other: &Fst) -> Self {
        Self::with_spaces(other.input_space.clone(), other.output_space.clone())
    }

    pub fn add_state(&mut self) -> StateId {
        self.states.push(State::new());
        (self.states.len() - 1) as StateId
    }

    #[inline]
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// State ids in arena order.
    pub fn states(&self) -> std::ops::Range<StateId> {
        0..self.states.len() as StateId
    }

    #[inline]
    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    pub fn set_start(&mut self, state: StateId) {
        self.start = Some(state);
    }

    /// True if the transducer has no start state and so accepts nothing.
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    #[inline]
    pub fn final_weight(&self, state: StateId) -> Weight {
        self.states[state as usize].final_weight
    }

    #[inline]
    pub fn is_final(&self, state: StateId) -> bool {
        !self.final_weight(state).is_zero()
    }

    /// Set the final weight of a state; [`Weight::ZERO`] makes it non-final.
    pub fn set_final(&mut self, state: StateId, weight: Weight) {
        self.states[state as usize].final_weight = weight;
    }

    #[inline]
    pub fn transitions(&self, state: StateId) -> &[Transition] {
        &self.states[state as usize].transitions
    }

    pub fn add_transition(&mut self, state: StateId, transition: Transition) {
        let transitions = &mut self.states[state as usize].transitions;
        if let Some(last) = transitions.last() {
            if last.sym_in > transition.sym_in {
                self.input_sorted = false;
            }
        }
        transitions.push(transition);
    }

    /// Mutable access to a state's transitions. Clears the sortedness flag.
    pub fn transitions_mut(&mut self, state: StateId) -> &mut Vec<Transition> {
        self.input_sorted = false;
        &mut self.states[state as usize].transitions
    }

    /// Apply `f` to every transition of every state.
    pub fn map_transitions(&mut self, mut f: impl FnMut(&mut Transition)) {
        for state in &mut self.states {
            state.transitions.iter_mut().for_each(&mut f);
        }
        self.input_sorted = false;
    }

    /// Stable-sort every state's transitions by input label.
    pub fn sort_transitions_by_input(&mut self) {
        if self.input_sorted {
            return;
        }
        for state in &mut self.states {
            state.transitions.sort_by_key(|t| t.sym_in);
        }
        self.input_sorted = true;
    }

    #[inline]
    pub fn is_input_sorted(&self) -> bool {
        self.input_sorted
    }

    /// Transitions of `state` whose input label equals `label`.
    ///
    /// Uses binary search when the transducer is input-sorted, a linear
    /// filter otherwise.
    pub fn transitions_with_input(&self, state: StateId, label: Label) -> TransitionsWithInput<'_> {
        let transitions = self.transitions(state);
        if self.input_sorted {
            let lo = transitions.partition_point(|t| t.sym_in < label);
            let hi = lo + transitions[lo..].partition_point(|t| t.sym_in == label);
            TransitionsWithInput {
                transitions: &transitions[lo..hi],
                label,
            }
        } else {
            TransitionsWithInput { transitions, label }
        }
    }

    #[inline]
    pub fn input_space(&self) -> &SymbolSpace {
        &self.input_space
    }

    #[inline]
    pub fn output_space(&self) -> &SymbolSpace {
        &self.output_space
    }

    pub fn set_input_space(&mut self, space: SymbolSpace) {
        self.input_space = space;
    }

    pub fn set_output_space(&mut self, space: SymbolSpace) {
        self.output_space = space;
    }

    /// True if every transition carries identical input and output labels.
    pub fn is_acceptor(&self) -> bool {
        self.states
            .iter()
            .all(|s| s.transitions.iter().all(|t| t.sym_in == t.sym_out))
    }

    /// Append all states of `other` to this arena, returning the offset added
    /// to `other`'s state ids. The start state of `self` is unchanged.
    pub(crate) fn append_states(&mut self, other: Fst) -> StateId {
        let offset = self.states.len() as StateId;
        let other_sorted = other.input_sorted;
        self.states.extend(other.states.into_iter().map(|mut state| {
            for t in &mut state.transitions {
                t.target_state += offset;
            }
            state
        }));
        self.input_sorted &= other_sorted;
        offset
    }

    /// Keep only the states for which `keep` is true, renumbering the rest
    /// and dropping transitions into removed states.
    pub(crate) fn retain_states(&mut self, keep: &[bool]) {
        let mut new_ids = vec![StateId::MAX; self.states.len()];
        let mut next: StateId = 0;
        for (i, &k) in keep.iter().enumerate() {
            if k {
                new_ids[i] = next;
                next += 1;
            }
        }

        let old_states = std::mem::take(&mut self.states);
        self.states = old_states
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep[*i])
            .map(|(_, mut state)| {
                state.transitions.retain(|t| keep[t.target_state as usize]);
                for t in &mut state.transitions {
                    t.target_state = new_ids[t.target_state as usize];
                }
                state
            })
            .collect();

        self.start = match self.start {
            Some(s) if keep[s as usize] => Some(new_ids[s as usize]),
            _ => None,
        };
    }

    /// Remove every state, leaving an empty transducer with the same spaces.
    pub(crate) fn clear(&mut self) {
        self.states.clear();
        self.start = None;
        self.input_sorted = true;
    }
}

/// Iterator returned by [`Fst::transitions_with_input`].
pub struct TransitionsWithInput<'a> {
    transitions: &'a [Transition],
    label: Label,
}

impl<'a> Iterator for TransitionsWithInput<'a> {
    type Item = &'a Transition;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((first, rest)) = self.transitions.split_first() {
            self.transitions = rest;
            if first.sym_in == self.label {
                return Some(first);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::EPSILON;

    fn two_state() -> Fst {
        let mut fst = Fst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, Weight::new(0.5));
        fst.add_transition(s0, Transition::new(98, 120, Weight::ONE, s1));
        fst.add_transition(s0, Transition::identity(97, s1));
        fst
    }

    #[test]
    fn build_and_inspect() {
        let fst = two_state();
        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.num_transitions(), 2);
        assert_eq!(fst.start(), Some(0));
        assert!(fst.is_final(1));
        assert!(!fst.is_final(0));
        assert_eq!(fst.final_weight(1), Weight::new(0.5));
        assert!(!fst.is_acceptor());
    }

    #[test]
    fn sortedness_tracking() {
        let mut fst = two_state();
        assert!(!fst.is_input_sorted());
        fst.sort_transitions_by_input();
        assert!(fst.is_input_sorted());
        assert_eq!(fst.transitions(0)[0].sym_in, 97);
    }

    #[test]
    fn transitions_with_input_sorted_and_unsorted() {
        let mut fst = two_state();
        let unsorted: Vec<_> = fst.transitions_with_input(0, 98).map(|t| t.sym_out).collect();
        assert_eq!(unsorted, vec![120]);
        fst.sort_transitions_by_input();
        let sorted: Vec<_> = fst.transitions_with_input(0, 98).map(|t| t.sym_out).collect();
        assert_eq!(sorted, vec![120]);
        assert_eq!(fst.transitions_with_input(0, EPSILON).count(), 0);
    }

    #[test]
    fn retain_states_renumbers() {
        let mut fst = Fst::new();
        let s0 = fst.add_state();
        let dead = fst.add_state();
        let s2 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s2, Weight::ONE);
        fst.add_transition(s0, Transition::identity(97, dead));
        fst.add_transition(s0, Transition::identity(98, s2));

        fst.retain_states(&[true, false, true]);

        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.transitions(0).len(), 1);
        assert_eq!(fst.transitions(0)[0].target_state, 1);
        assert!(fst.is_final(1));
    }

    #[test]
    fn retain_states_dropping_start_empties() {
        let mut fst = two_state();
        fst.retain_states(&[false, true]);
        assert!(fst.is_empty());
    }

    #[test]
    fn append_states_offsets_targets() {
        let mut a = two_state();
        let b = two_state();
        let offset = a.append_states(b);
        assert_eq!(offset, 2);
        assert_eq!(a.num_states(), 4);
        assert_eq!(a.transitions(2)[0].target_state, 3);
        assert_eq!(a.start(), Some(0));
    }
}
