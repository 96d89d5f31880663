/// Tolerance used when comparing probabilities, masses and distances.
///
/// Values whose absolute difference is below `epsilon` are treated as equal,
/// values whose magnitude is below `epsilon` are treated as zero.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerance {
    pub epsilon: f64,
}

impl Tolerance {
    /// Default for the optimal coupling computer.
    pub const STANDARD: Self = Tolerance { epsilon: 1e-10 };

    pub const fn new(epsilon: f64) -> Self {
        Tolerance { epsilon }
    }

    /// Tolerance for probabilities that are given with `precision` decimal digits.
    ///
    /// Two such probabilities are equal if they differ by less than half a unit
    /// in the last digit, that is `10^-precision / 2`.
    pub fn from_precision(precision: i32) -> Self {
        Tolerance { epsilon: 10f64.powi(-precision) / 2.0 }
    }

    #[inline]
    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() < self.epsilon
    }

    #[inline]
    pub fn is_positive(&self, value: f64) -> bool {
        value >= self.epsilon
    }

    #[inline]
    pub fn eq(&self, a: f64, b: f64) -> bool {
        self.is_zero(a - b)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::STANDARD
    }
}
