// Weighted composition with the three-state epsilon-sequencing filter.

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::FstError;
use crate::fst::{Fst, StateId};
use crate::optimize::connect;
use crate::symbols::EPSILON;
use crate::transition::Transition;

/// Filter state of the epsilon-sequencing filter.
///
/// `Free`: either side may move next. `LeftEps`: the left machine just moved
/// alone on an output epsilon, so the right machine may not move alone until
/// a real match. `RightEps`: the mirror case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Filter {
    Free,
    LeftEps,
    RightEps,
}

type PairState = (StateId, StateId, Filter);

/// Compose `a` (applied first) with `b`.
///
/// The output tape of `a` is matched against the input tape of `b`; weights
/// add. Fails with [`FstError::ComposeMismatch`] when the symbol spaces of
/// the matched tapes differ. The result is connected.
pub fn compose(a: &Fst, b: &Fst) -> Result<Fst, FstError> {
    if a.output_space() != b.input_space() {
        return Err(FstError::ComposeMismatch {
            left: a.output_space().to_string(),
            right: b.input_space().to_string(),
        });
    }

    let mut result = Fst::with_spaces(a.input_space().clone(), b.output_space().clone());
    let (Some(a_start), Some(b_start)) = (a.start(), b.start()) else {
        return Ok(result);
    };

    let mut ids: HashMap<PairState, StateId> = HashMap::new();
    let mut queue: VecDeque<PairState> = VecDeque::new();

    let start = (a_start, b_start, Filter::Free);
    ids.insert(start, result.add_state());
    result.set_start(0);
    queue.push_back(start);

    let mut arcs: Vec<(Transition, PairState)> = Vec::new();

    while let Some(pair) = queue.pop_front() {
        let (qa, qb, filter) = pair;
        let source = ids[&pair];
        result.set_final(source, a.final_weight(qa).times(b.final_weight(qb)));

        arcs.clear();
        for ta in a.transitions(qa) {
            if ta.sym_out == EPSILON {
                // Left moves alone.
                if filter != Filter::RightEps {
                    arcs.push((
                        Transition::new(ta.sym_in, EPSILON, ta.weight, 0),
                        (ta.target_state, qb, Filter::LeftEps),
                    ));
                }
                // Both move on epsilon together.
                if filter == Filter::Free {
                    for tb in b.transitions_with_input(qb, EPSILON) {
                        arcs.push((
                            Transition::new(ta.sym_in, tb.sym_out, ta.weight.times(tb.weight), 0),
                            (ta.target_state, tb.target_state, Filter::Free),
                        ));
                    }
                }
            } else {
                for tb in b.transitions_with_input(qb, ta.sym_out) {
                    arcs.push((
                        Transition::new(ta.sym_in, tb.sym_out, ta.weight.times(tb.weight), 0),
                        (ta.target_state, tb.target_state, Filter::Free),
                    ));
                }
            }
        }
        // Right moves alone.
        if filter != Filter::LeftEps {
            for tb in b.transitions_with_input(qb, EPSILON) {
                arcs.push((
                    Transition::new(EPSILON, tb.sym_out, tb.weight, 0),
                    (qa, tb.target_state, Filter::RightEps),
                ));
            }
        }

        for (mut transition, target) in arcs.drain(..) {
            let target_id = match ids.get(&target) {
                Some(&id) => id,
                None => {
                    let id = result.add_state();
                    ids.insert(target, id);
                    queue.push_back(target);
                    id
                }
            };
            transition.target_state = target_id;
            result.add_transition(source, transition);
        }
    }

    connect(&mut result);
    Ok(result)
}
