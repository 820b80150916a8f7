// Ranked transduction output.

/// One output string of a decode call with its total path cost.
///
/// Lower weights are better; hypotheses are returned in ascending weight
/// order. A weight of `0.0` is the cost of a path through unweighted rules.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hypothesis {
    pub text: String,
    pub weight: f32,
}

impl Hypothesis {
    pub fn new(text: impl Into<String>, weight: f32) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

impl std::fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.text, self.weight)
    }
}

/// Direction of a transduction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Spelling to pronunciation.
    GraphemeToPhoneme,
    /// Pronunciation to ranked spellings.
    PhonemeToGrapheme,
}
