// Transition struct and the fixed-size records used by the binary model format.

use bytemuck::{Pod, Zeroable};

use crate::fst::StateId;
use crate::symbols::{EPSILON, Label};
use crate::weight::Weight;

/// One outgoing transition of a state.
///
/// Owned by its source state's adjacency list; `target_state` indexes the
/// state arena of the same transducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub sym_in: Label,
    pub sym_out: Label,
    pub weight: Weight,
    pub target_state: StateId,
}

impl Transition {
    pub fn new(sym_in: Label, sym_out: Label, weight: Weight, target_state: StateId) -> Self {
        Self {
            sym_in,
            sym_out,
            weight,
            target_state,
        }
    }

    /// Identity transition with weight one.
    pub fn identity(label: Label, target_state: StateId) -> Self {
        Self::new(label, label, Weight::ONE, target_state)
    }

    /// Epsilon transition carrying `weight`.
    pub fn epsilon(weight: Weight, target_state: StateId) -> Self {
        Self::new(EPSILON, EPSILON, weight, target_state)
    }

    /// True if the transition consumes and emits nothing.
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.sym_in == EPSILON && self.sym_out == EPSILON
    }
}

/// Serialized transition (16 bytes).
///
/// Layout:
/// - `sym_in` (u32): input label
/// - `sym_out` (u32): output label
/// - `target_state` (u32): target state index
/// - `weight` (f32): tropical weight (`+inf` never appears on a transition)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransitionRecord {
    pub sym_in: u32,
    pub sym_out: u32,
    pub target_state: u32,
    pub weight: f32,
}

impl From<&Transition> for TransitionRecord {
    fn from(t: &Transition) -> Self {
        Self {
            sym_in: t.sym_in,
            sym_out: t.sym_out,
            target_state: t.target_state,
            weight: t.weight.value(),
        }
    }
}

impl From<&TransitionRecord> for Transition {
    fn from(r: &TransitionRecord) -> Self {
        Transition::new(r.sym_in, r.sym_out, Weight::new(r.weight), r.target_state)
    }
}

/// Serialized state header (16 bytes).
///
/// Transitions of a state are stored contiguously in the transition table
/// starting at `first_transition`. A non-final state stores `+inf` as its
/// final weight.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StateRecord {
    pub first_transition: u32,
    pub transition_count: u32,
    pub final_weight: f32,
    pub _reserved: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes() {
        assert_eq!(size_of::<TransitionRecord>(), 16);
        assert_eq!(size_of::<StateRecord>(), 16);
    }

    #[test]
    fn zero_copy_cast_transition_record() {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&97u32.to_le_bytes());
        bytes[4..8].copy_from_slice(&98u32.to_le_bytes());
        bytes[8..12].copy_from_slice(&7u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&1.5f32.to_le_bytes());

        let record: TransitionRecord = bytemuck::pod_read_unaligned(&bytes);
        let t = Transition::from(&record);
        assert_eq!(t.sym_in, 97);
        assert_eq!(t.sym_out, 98);
        assert_eq!(t.target_state, 7);
        assert_eq!(t.weight, Weight::new(1.5));
    }

    #[test]
    fn epsilon_detection() {
        assert!(Transition::epsilon(Weight::ONE, 0).is_epsilon());
        assert!(!Transition::new(EPSILON, 97, Weight::ONE, 0).is_epsilon());
        assert!(!Transition::identity(97, 0).is_epsilon());
    }
}
