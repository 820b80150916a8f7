// Binary model format: header, symbol tables, state and transition tables.

use std::sync::Arc;

use crate::FstError;
use crate::fst::{Fst, StateId};
use crate::symbols::{SymbolSpace, parse_symbol_table};
use crate::transition::{StateRecord, Transition, TransitionRecord};
use crate::weight::Weight;

/// Model header magic constants (little-endian).
const COOKIE1: u32 = 0x4841_4144;
const COOKIE2: u32 = 0x0001_F57A;

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Size of the counts block that follows the symbol tables.
const COUNTS_SIZE: usize = 16;

const FLAG_INPUT_TABLE: u8 = 0x01;
const FLAG_OUTPUT_TABLE: u8 = 0x02;
const FLAG_SHARED_TABLE: u8 = 0x04;

/// Parsed model file header.
///
/// Layout of the first 16 bytes:
/// - bytes 0..4: cookie1 (magic number)
/// - bytes 4..8: cookie2 (magic number)
/// - byte 8: format version
/// - byte 9: symbol table flags (input table, output table, output shares
///   the input table)
/// - bytes 10..16: reserved (zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHeader {
    pub version: u8,
    pub input_table: bool,
    pub output_table: bool,
    pub shared_table: bool,
}

/// Parse and validate the 16-byte model header.
pub fn parse_header(data: &[u8]) -> Result<ModelHeader, FstError> {
    if data.len() < HEADER_SIZE {
        return Err(FstError::TooShort {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let cookie1 = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let cookie2 = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if cookie1 != COOKIE1 || cookie2 != COOKIE2 {
        return Err(FstError::InvalidMagic);
    }

    let version = data[8];
    if version != FORMAT_VERSION {
        return Err(FstError::UnsupportedVersion(version));
    }

    let flags = data[9];
    Ok(ModelHeader {
        version,
        input_table: flags & FLAG_INPUT_TABLE != 0,
        output_table: flags & FLAG_OUTPUT_TABLE != 0,
        shared_table: flags & FLAG_SHARED_TABLE != 0,
    })
}

fn align16(offset: usize) -> usize {
    offset.div_ceil(16) * 16
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Copy `count` fixed-size records starting at `offset` into an aligned Vec.
fn read_records<T: bytemuck::Pod>(data: &[u8], offset: usize, count: usize) -> Result<Vec<T>, FstError> {
    let size = count * size_of::<T>();
    let end = offset + size;
    if end > data.len() {
        return Err(FstError::TooShort {
            expected: end,
            actual: data.len(),
        });
    }
    let mut records = vec![T::zeroed(); count];
    bytemuck::cast_slice_mut::<T, u8>(&mut records).copy_from_slice(&data[offset..end]);
    Ok(records)
}

impl Fst {
    /// Serialize to the binary model format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let input_table = match self.input_space() {
            SymbolSpace::Table(table) => Some(table),
            SymbolSpace::Utf8 => None,
        };
        let output_table = match self.output_space() {
            SymbolSpace::Table(table) => Some(table),
            SymbolSpace::Utf8 => None,
        };
        let shared = input_table.is_some() && self.input_space() == self.output_space();

        let mut flags = 0u8;
        if input_table.is_some() {
            flags |= FLAG_INPUT_TABLE;
        }
        if output_table.is_some() {
            flags |= FLAG_OUTPUT_TABLE;
        }
        if shared {
            flags |= FLAG_SHARED_TABLE;
        }

        let mut buf = vec![0u8; HEADER_SIZE];
        buf[..4].copy_from_slice(&COOKIE1.to_le_bytes());
        buf[4..8].copy_from_slice(&COOKIE2.to_le_bytes());
        buf[8] = FORMAT_VERSION;
        buf[9] = flags;

        if let Some(table) = input_table {
            table.write_to(&mut buf);
        }
        if let Some(table) = output_table.filter(|_| !shared) {
            table.write_to(&mut buf);
        }
        buf.resize(align16(buf.len()), 0);

        let mut states = Vec::with_capacity(self.num_states());
        let mut transitions = Vec::with_capacity(self.num_transitions());
        for state in self.states() {
            states.push(StateRecord {
                first_transition: transitions.len() as u32,
                transition_count: self.transitions(state).len() as u32,
                final_weight: self.final_weight(state).value(),
                _reserved: 0,
            });
            transitions.extend(self.transitions(state).iter().map(TransitionRecord::from));
        }

        buf.extend_from_slice(&(states.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.start().unwrap_or(StateId::MAX).to_le_bytes());
        buf.extend_from_slice(&(transitions.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(bytemuck::cast_slice(states.as_slice()));
        buf.extend_from_slice(bytemuck::cast_slice(transitions.as_slice()));
        buf
    }

    /// Parse a transducer from the binary model format, validating every
    /// state and transition index.
    pub fn from_bytes(data: &[u8]) -> Result<Fst, FstError> {
        let header = parse_header(data)?;

        let mut offset = HEADER_SIZE;
        let input_space = if header.input_table {
            let (table, end) = parse_symbol_table(data, offset)?;
            offset = end;
            SymbolSpace::Table(Arc::new(table))
        } else {
            SymbolSpace::Utf8
        };
        let output_space = if header.shared_table {
            if !header.input_table {
                return Err(FstError::InvalidSymbolTable(
                    "shared output table without an input table".into(),
                ));
            }
            input_space.clone()
        } else if header.output_table {
            let (table, end) = parse_symbol_table(data, offset)?;
            offset = end;
            SymbolSpace::Table(Arc::new(table))
        } else {
            SymbolSpace::Utf8
        };

        offset = align16(offset);
        if offset + COUNTS_SIZE > data.len() {
            return Err(FstError::TooShort {
                expected: offset + COUNTS_SIZE,
                actual: data.len(),
            });
        }
        let state_count = read_u32(data, offset) as usize;
        let start = read_u32(data, offset + 4);
        let transition_count = read_u32(data, offset + 8) as usize;
        offset += COUNTS_SIZE;

        let states: Vec<StateRecord> = read_records(data, offset, state_count)?;
        offset += state_count * size_of::<StateRecord>();
        let transitions: Vec<TransitionRecord> = read_records(data, offset, transition_count)?;

        let input_limit = table_limit(&input_space);
        let output_limit = table_limit(&output_space);

        let mut fst = Fst::with_spaces(input_space, output_space);
        for _ in 0..state_count {
            fst.add_state();
        }
        if start != StateId::MAX {
            if start as usize >= state_count {
                return Err(FstError::InvalidStateTable(format!(
                    "start state {start} out of range ({state_count} states)"
                )));
            }
            fst.set_start(start);
        }

        for (index, record) in states.iter().enumerate() {
            let first = record.first_transition as usize;
            let end = first + record.transition_count as usize;
            if end > transition_count {
                return Err(FstError::InvalidStateTable(format!(
                    "state {index} transitions {first}..{end} exceed table of {transition_count}"
                )));
            }
            if !is_valid_weight(record.final_weight) {
                return Err(FstError::InvalidStateTable(format!(
                    "state {index} has final weight {}",
                    record.final_weight
                )));
            }
            let state = index as StateId;
            fst.set_final(state, Weight::new(record.final_weight));
            for record in &transitions[first..end] {
                if record.target_state as usize >= state_count {
                    return Err(FstError::InvalidStateTable(format!(
                        "state {index} has a transition to missing state {}",
                        record.target_state
                    )));
                }
                if record.sym_in >= input_limit || record.sym_out >= output_limit {
                    return Err(FstError::InvalidStateTable(format!(
                        "state {index} has a transition with a label outside its symbol table"
                    )));
                }
                if !is_valid_weight(record.weight) {
                    return Err(FstError::InvalidStateTable(format!(
                        "state {index} has a transition with weight {}",
                        record.weight
                    )));
                }
                fst.add_transition(state, Transition::from(record));
            }
        }

        Ok(fst)
    }
}

/// Tropical weights are non-negative reals or +inf.
fn is_valid_weight(value: f32) -> bool {
    value >= 0.0
}

fn table_limit(space: &SymbolSpace) -> u32 {
    match space {
        SymbolSpace::Table(table) => table.len() as u32,
        SymbolSpace::Utf8 => u32::MAX,
    }
}
