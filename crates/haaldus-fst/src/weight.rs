// Tropical semiring weight.

use std::cmp::Ordering;

/// Quantization step used when weights are compared for equality during
/// determinization and minimization.
const QUANTIZATION_DELTA: f32 = 1.0 / 1024.0;

/// A weight in the tropical semiring.
///
/// `times` (extending a path) is addition and `plus` (choosing between
/// alternative paths) is the minimum. [`Weight::ZERO`] is +∞ and marks the
/// absence of a path; [`Weight::ONE`] is `0.0`, the cost of a free step.
#[derive(Debug, Clone, Copy)]
pub struct Weight(f32);

impl Weight {
    /// Semiring zero: no path.
    pub const ZERO: Weight = Weight(f32::INFINITY);
    /// Semiring one: a path step that costs nothing.
    pub const ONE: Weight = Weight(0.0);

    pub fn new(value: f32) -> Self {
        // Fold -0.0 into 0.0 so that `Ord` agrees with numeric equality.
        if value == 0.0 { Self::ONE } else { Self(value) }
    }

    #[inline]
    pub fn value(self) -> f32 {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == f32::INFINITY
    }

    #[inline]
    pub fn is_one(self) -> bool {
        self.0 == 0.0
    }

    /// Best of two alternatives.
    #[inline]
    pub fn plus(self, other: Weight) -> Weight {
        if other.0 < self.0 { other } else { self }
    }

    /// Path extension.
    #[inline]
    pub fn times(self, other: Weight) -> Weight {
        if self.is_zero() || other.is_zero() {
            return Self::ZERO;
        }
        Self::new(self.0 + other.0)
    }

    /// Left division: the weight `w` such that `other.times(w) == self`.
    /// Dividing by zero yields zero.
    #[inline]
    pub fn divide(self, other: Weight) -> Weight {
        if self.is_zero() || other.is_zero() {
            return Self::ZERO;
        }
        Self::new(self.0 - other.0)
    }

    /// Integer key used to compare weights up to the quantization delta.
    pub fn quantize(self) -> i64 {
        if self.is_zero() {
            return i64::MAX;
        }
        (self.0 / QUANTIZATION_DELTA).round() as i64
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::ONE
    }
}

impl From<f32> for Weight {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Weight {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Weight {}

impl PartialOrd for Weight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Weight {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            write!(f, "Infinity")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semiring_identities() {
        let w = Weight::new(2.5);
        assert_eq!(w.times(Weight::ONE), w);
        assert_eq!(w.plus(Weight::ZERO), w);
        assert_eq!(w.times(Weight::ZERO), Weight::ZERO);
    }

    #[test]
    fn plus_is_minimum() {
        assert_eq!(Weight::new(1.0).plus(Weight::new(3.0)), Weight::new(1.0));
        assert_eq!(Weight::new(3.0).plus(Weight::new(1.0)), Weight::new(1.0));
    }

    #[test]
    fn times_is_addition() {
        assert_eq!(Weight::new(1.5).times(Weight::new(2.0)), Weight::new(3.5));
    }

    #[test]
    fn divide_inverts_times() {
        let a = Weight::new(4.0);
        let b = Weight::new(1.5);
        assert_eq!(a.times(b).divide(b), a);
        assert!(a.divide(Weight::ZERO).is_zero());
    }

    #[test]
    fn negative_zero_is_one() {
        assert!(Weight::new(-0.0).is_one());
        assert_eq!(Weight::new(-0.0), Weight::ONE);
    }

    #[test]
    fn ordering_puts_zero_last() {
        let mut weights = vec![Weight::ZERO, Weight::new(2.0), Weight::ONE];
        weights.sort();
        assert_eq!(weights, vec![Weight::ONE, Weight::new(2.0), Weight::ZERO]);
    }

    #[test]
    fn quantize_absorbs_rounding_noise() {
        let noisy = Weight::new(0.1 + 0.2 - 0.3);
        assert_eq!(noisy.quantize(), Weight::ONE.quantize());
        assert_eq!(Weight::ZERO.quantize(), i64::MAX);
    }
}
