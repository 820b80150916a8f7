// Shortest distance and n-best path extraction.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use haaldus_core::Hypothesis;
use hashbrown::HashSet;
use tracing::warn;

use crate::config::DecodeConfig;
use crate::fst::{Fst, StateId};
use crate::symbols::Label;
use crate::weight::Weight;

/// Single-source shortest distances.
///
/// With `reverse == false`, entry `q` is the best weight of a path from the
/// start state to `q`. With `reverse == true`, it is the best weight from `q`
/// to a final state, final weight included. Unreachable entries are
/// [`Weight::ZERO`]. Uses a FIFO label-correcting relaxation, which
/// terminates for machines without negative cycles.
pub fn shortest_distance(fst: &Fst, reverse: bool) -> Vec<Weight> {
    let n = fst.num_states();
    let mut distance = vec![Weight::ZERO; n];
    let mut queued = vec![false; n];
    let mut queue: VecDeque<StateId> = VecDeque::new();

    // Adjacency as (neighbor, weight) in the direction of relaxation.
    let adjacency: Vec<Vec<(StateId, Weight)>> = if reverse {
        let mut incoming = vec![Vec::new(); n];
        for state in fst.states() {
            for t in fst.transitions(state) {
                incoming[t.target_state as usize].push((state, t.weight));
            }
        }
        for state in fst.states() {
            if fst.is_final(state) {
                distance[state as usize] = fst.final_weight(state);
                queued[state as usize] = true;
                queue.push_back(state);
            }
        }
        incoming
    } else {
        if let Some(start) = fst.start() {
            distance[start as usize] = Weight::ONE;
            queued[start as usize] = true;
            queue.push_back(start);
        }
        fst.states()
            .map(|s| fst.transitions(s).iter().map(|t| (t.target_state, t.weight)).collect())
            .collect()
    };

    while let Some(state) = queue.pop_front() {
        queued[state as usize] = false;
        let d = distance[state as usize];
        for &(next, weight) in &adjacency[state as usize] {
            let candidate = d.times(weight);
            if candidate < distance[next as usize] {
                distance[next as usize] = candidate;
                if !queued[next as usize] {
                    queued[next as usize] = true;
                    queue.push_back(next);
                }
            }
        }
    }

    distance
}

/// Pseudo-state reached by taking a state's final weight.
const FINAL: StateId = StateId::MAX;

/// A partial path in the search tree.
struct Node {
    state: StateId,
    parent: Option<usize>,
    label: Label,
    cost: Weight,
}

/// Extract up to `config.n_best` best paths of `fst`, reading the output
/// tape.
///
/// A* search where the heuristic is the exact reverse shortest distance, so
/// complete paths leave the queue in non-decreasing weight order; equal
/// weights keep discovery order. With `config.unique` a path whose output
/// string was already returned is skipped. The search stops after
/// `config.max_visits` queue pops. A machine with no accepting path yields an
/// empty list.
pub fn n_shortest_paths(fst: &Fst, config: &DecodeConfig) -> Vec<Hypothesis> {
    let mut results = Vec::new();
    let Some(start) = fst.start() else {
        return results;
    };
    if config.n_best == 0 {
        return results;
    }
    let future = shortest_distance(fst, true);
    if future[start as usize].is_zero() {
        return results;
    }

    let mut nodes: Vec<Node> = Vec::new();
    let mut heap: BinaryHeap<Reverse<(Weight, u64, usize)>> = BinaryHeap::new();
    let mut sequence: u64 = 0;
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |nodes: &mut Vec<Node>, heap: &mut BinaryHeap<_>, node: Node, estimate: Weight| {
        nodes.push(node);
        heap.push(Reverse((estimate, sequence, nodes.len() - 1)));
        sequence += 1;
    };

    push(
        &mut nodes,
        &mut heap,
        Node { state: start, parent: None, label: 0, cost: Weight::ONE },
        future[start as usize],
    );

    let mut visits = 0usize;
    while let Some(Reverse((_, _, index))) = heap.pop() {
        visits += 1;
        if visits > config.max_visits {
            warn!(
                max_visits = config.max_visits,
                found = results.len(),
                "n-best search hit its visit limit"
            );
            break;
        }

        let state = nodes[index].state;
        let cost = nodes[index].cost;

        if state == FINAL {
            let text = fst.output_space().labels_to_string(&path_labels(&nodes, index));
            if config.unique && !seen.insert(text.clone()) {
                continue;
            }
            results.push(Hypothesis::new(text, cost.value()));
            if results.len() >= config.n_best {
                break;
            }
            continue;
        }

        let final_weight = fst.final_weight(state);
        if !final_weight.is_zero() {
            let total = cost.times(final_weight);
            push(
                &mut nodes,
                &mut heap,
                Node { state: FINAL, parent: Some(index), label: 0, cost: total },
                total,
            );
        }
        for t in fst.transitions(state) {
            let h = future[t.target_state as usize];
            if h.is_zero() {
                continue;
            }
            let g = cost.times(t.weight);
            push(
                &mut nodes,
                &mut heap,
                Node { state: t.target_state, parent: Some(index), label: t.sym_out, cost: g },
                g.times(h),
            );
        }
    }

    results
}

/// Output labels from the root to `index`, in path order.
fn path_labels(nodes: &[Node], mut index: usize) -> Vec<Label> {
    let mut labels = Vec::new();
    loop {
        let node = &nodes[index];
        labels.push(node.label);
        match node.parent {
            Some(parent) => index = parent,
            None => break,
        }
    }
    labels.reverse();
    labels
}
