// Labels, symbol tables, symbol spaces and declared alphabets.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::FstError;
use crate::fst::Fst;
use crate::transition::Transition;
use crate::weight::Weight;

/// Transition label. In the UTF-8 symbol space a label is the Unicode scalar
/// value of a character; in a table space it indexes a [`SymbolTable`].
pub type Label = u32;

/// The empty label: consumes or emits nothing.
pub const EPSILON: Label = 0;

/// First label reserved for compiler-internal markers. It lies above the
/// Unicode range so markers never collide with characters.
pub const FIRST_MARKER_LABEL: Label = 0x0011_0000;

/// Symbol table of an external vocabulary.
///
/// Index 0 is always epsilon (the empty string). Every other entry is a
/// non-empty string; an entry may span several characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    symbol_strings: Vec<String>,
    string_to_symbol: HashMap<String, Label>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbol_strings: vec![String::new()],
            string_to_symbol: HashMap::new(),
        }
    }

    /// Add a symbol, returning its label. Adding an existing symbol returns
    /// the label it already has.
    pub fn add_symbol(&mut self, symbol: &str) -> Label {
        if symbol.is_empty() {
            return EPSILON;
        }
        if let Some(&label) = self.string_to_symbol.get(symbol) {
            return label;
        }
        let label = self.symbol_strings.len() as Label;
        self.symbol_strings.push(symbol.to_string());
        self.string_to_symbol.insert(symbol.to_string(), label);
        label
    }

    pub fn get_symbol(&self, label: Label) -> Option<&str> {
        self.symbol_strings.get(label as usize).map(String::as_str)
    }

    pub fn get_label(&self, symbol: &str) -> Option<Label> {
        if symbol.is_empty() {
            return Some(EPSILON);
        }
        self.string_to_symbol.get(symbol).copied()
    }

    /// Number of entries including epsilon.
    pub fn len(&self) -> usize {
        self.symbol_strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbol_strings.len() <= 1
    }

    /// Iterate over `(label, symbol)` pairs, skipping epsilon.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &str)> {
        self.symbol_strings
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, s)| (i as Label, s.as_str()))
    }

    /// Append the serialized table: `u32` count followed by NUL-terminated
    /// UTF-8 strings, epsilon first.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.symbol_strings.len() as u32).to_le_bytes());
        for symbol in &self.symbol_strings {
            buf.extend_from_slice(symbol.as_bytes());
            buf.push(0);
        }
    }
}

/// Parse a serialized symbol table starting at `offset`.
///
/// Returns the table and the byte offset immediately after it (before
/// padding). The first entry must be the empty string.
pub fn parse_symbol_table(data: &[u8], offset: usize) -> Result<(SymbolTable, usize), FstError> {
    if offset + 4 > data.len() {
        return Err(FstError::TooShort {
            expected: offset + 4,
            actual: data.len(),
        });
    }

    let symbol_count = u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]);
    let mut pos = offset + 4;
    let mut table = SymbolTable::new();

    for i in 0..symbol_count {
        let str_start = pos;
        while pos < data.len() && data[pos] != 0 {
            pos += 1;
        }
        if pos >= data.len() {
            return Err(FstError::InvalidSymbolTable("unterminated symbol string".to_string()));
        }
        let symbol_bytes = &data[str_start..pos];
        pos += 1; // skip null terminator

        if i == 0 {
            if !symbol_bytes.is_empty() {
                return Err(FstError::InvalidSymbolTable("entry 0 must be epsilon".to_string()));
            }
            continue;
        }

        let symbol = std::str::from_utf8(symbol_bytes)
            .map_err(|_| FstError::InvalidSymbolTable(format!("invalid UTF-8 in symbol {i}")))?;
        if symbol.is_empty() {
            return Err(FstError::InvalidSymbolTable(format!("empty symbol at index {i}")));
        }
        if table.add_symbol(symbol) != i {
            return Err(FstError::InvalidSymbolTable(format!("duplicate symbol {symbol:?}")));
        }
    }

    Ok((table, pos))
}

/// The alphabet a transducer tape ranges over.
#[derive(Debug, Clone, Default)]
pub enum SymbolSpace {
    /// Labels are Unicode scalar values.
    #[default]
    Utf8,
    /// Labels index an external symbol table.
    Table(Arc<SymbolTable>),
}

impl SymbolSpace {
    /// Render a single label, or `None` for epsilon, markers and labels
    /// missing from the space.
    pub fn label_to_string(&self, label: Label) -> Option<String> {
        if label == EPSILON {
            return None;
        }
        match self {
            SymbolSpace::Utf8 => char::from_u32(label).map(String::from),
            SymbolSpace::Table(table) => table.get_symbol(label).map(str::to_string),
        }
    }

    /// Concatenate the rendering of a label sequence, skipping epsilon.
    pub fn labels_to_string(&self, labels: &[Label]) -> String {
        labels.iter().filter_map(|&l| self.label_to_string(l)).collect()
    }
}

impl PartialEq for SymbolSpace {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SymbolSpace::Utf8, SymbolSpace::Utf8) => true,
            (SymbolSpace::Table(a), SymbolSpace::Table(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for SymbolSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolSpace::Utf8 => write!(f, "utf8"),
            SymbolSpace::Table(table) => write!(f, "symbol table ({} symbols)", table.len()),
        }
    }
}

/// The declared set of characters a pipeline accepts.
///
/// Builds identity machines over the alphabet and checks literal strings
/// against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Build an alphabet from any characters; duplicates are removed.
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        let mut chars: Vec<char> = chars.into_iter().collect();
        chars.sort_unstable();
        chars.dedup();
        Self { chars }
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        self.chars.binary_search(&c).is_ok()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Labels of every character, ascending.
    pub fn labels(&self) -> Vec<Label> {
        self.chars.iter().map(|&c| c as Label).collect()
    }

    /// Check every character of `s`, reporting the first one outside the
    /// alphabet.
    pub fn check(&self, s: &str) -> Result<(), FstError> {
        match s.chars().enumerate().find(|&(_, c)| !self.contains(c)) {
            Some((position, symbol)) => Err(FstError::InvalidSymbol { symbol, position }),
            None => Ok(()),
        }
    }

    /// Acceptor for one symbol of the alphabet.
    pub fn sigma(&self) -> Fst {
        let mut fst = Fst::new();
        let start = fst.add_state();
        let end = fst.add_state();
        fst.set_start(start);
        fst.set_final(end, Weight::ONE);
        for label in self.labels() {
            fst.add_transition(start, Transition::identity(label, end));
        }
        fst
    }

    /// Identity acceptor for every string over the alphabet.
    pub fn sigma_star(&self) -> Fst {
        let mut fst = Fst::new();
        let state = fst.add_state();
        fst.set_start(state);
        fst.set_final(state, Weight::ONE);
        for label in self.labels() {
            fst.add_transition(state, Transition::identity(label, state));
        }
        fst
    }

    /// Linear acceptor for `s`, failing on characters outside the alphabet.
    pub fn acceptor(&self, s: &str) -> Result<Fst, FstError> {
        self.check(s)?;
        Ok(crate::algebra::acceptor(s))
    }

    /// Literal cross product `a -> b` with both strings checked against the
    /// alphabet.
    pub fn cross(&self, a: &str, b: &str, weight: Weight) -> Result<Fst, FstError> {
        self.check(a)?;
        self.check(b)?;
        Ok(crate::algebra::literal_cross(a, b, weight))
    }

    /// Union of literal cross products, each checked against the alphabet.
    pub fn string_map<'a>(&self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Fst, FstError> {
        let crosses = pairs
            .into_iter()
            .map(|(a, b)| self.cross(a, b, Weight::ONE))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(crate::algebra::union(crosses))
    }
}
