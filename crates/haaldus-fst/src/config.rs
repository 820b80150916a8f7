// Decode configuration

use crate::MAX_VISIT_COUNT;

/// Settings for turning a lattice into a ranked hypothesis list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Maximum number of hypotheses returned.
    pub n_best: usize,
    /// Drop paths whose output string was already returned.
    pub unique: bool,
    /// Maximum number of search queue pops before giving up with what was
    /// found so far.
    pub max_visits: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            n_best: 3,
            unique: true,
            max_visits: MAX_VISIT_COUNT,
        }
    }
}

impl DecodeConfig {
    pub fn with_n_best(mut self, n_best: usize) -> Self {
        self.n_best = n_best;
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_max_visits(mut self, max_visits: usize) -> Self {
        self.max_visits = max_visits;
        self
    }
}
