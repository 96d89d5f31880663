//! Probabilistic bisimilarity distances.
//!
//! The distances are the least fixed point of the function that maps a distance matrix `D`
//! to the matrix `D'` with
//!
//! * `D'(s, t) = 1` if `s` and `t` have different labels,
//! * `D'(s, t) =` the cost of an optimal coupling of the distributions of `s` and `t`
//!   under `D` otherwise.
//!
//! Starting from the zero matrix, [`DistanceIteration`] applies this function a given number
//! of times. The approximations increase towards the fixed point.

use std::fmt;

use log::debug;
use ndarray::{Array2, ArrayView2};

use crate::{LabelledMarkovChain, ParseError};
use crate::coupling::OptimalCoupling;
use crate::equivalence::EquivalenceRelation;
use crate::tolerance::Tolerance;

/// Symmetric matrix of distances in `[0, 1]` with zero diagonal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceMatrix {
    array: Array2<f64>,
}

impl DistanceMatrix {
    /// All distances zero.
    pub fn zero(n_states: usize) -> Self {
        DistanceMatrix { array: Array2::zeros((n_states, n_states)) }
    }

    /// Distance 1 between states with different labels, 0 otherwise.
    pub fn from_labels(labels: &[i32]) -> Self {
        let n = labels.len();
        let array = Array2::from_shape_fn((n, n), |(s, t)| {
            if labels[s] == labels[t] { 0.0 } else { 1.0 }
        });
        DistanceMatrix { array }
    }

    /// Wrap an existing matrix.
    ///
    /// # Panics
    ///
    /// Panics if `array` is not square.
    pub fn from_array(array: Array2<f64>) -> Self {
        assert_eq!(array.nrows(), array.ncols(), "Distance matrix must be square");
        DistanceMatrix { array }
    }

    /// Read the upper triangle of a distance matrix,
    /// `distance[s][t]` for all `s < t` in row-major order, separated by whitespace.
    pub fn from_str_upper(n_states: usize, input: &str) -> Result<Self, ParseError> {
        let mut values = input.split_whitespace();
        let mut matrix = Self::zero(n_states);
        for s in 0..n_states {
            for t in s + 1..n_states {
                let d: f64 = values.next().ok_or(ParseError::MissingField)?.parse()?;
                matrix.set(s, t, d);
            }
        }
        Ok(matrix)
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.array.nrows()
    }

    #[inline]
    pub fn get(&self, s: usize, t: usize) -> f64 {
        self.array[[s, t]]
    }

    /// Set the distance between `s` and `t` in both directions.
    #[inline]
    pub fn set(&mut self, s: usize, t: usize, distance: f64) {
        self.array[[s, t]] = distance;
        self.array[[t, s]] = distance;
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.array.view()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.array
    }

    /// Largest absolute difference to another matrix of the same size.
    pub fn max_difference(&self, other: &DistanceMatrix) -> f64 {
        self.array.iter()
            .zip(other.array.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// The equivalence relation generated by all pairs at distance zero, up to `tolerance`.
    ///
    /// For the exact distances this is probabilistic bisimilarity.
    pub fn kernel(&self, tolerance: Tolerance) -> EquivalenceRelation {
        let n = self.n_states();
        let pairs = (0..n)
            .flat_map(|s| (s + 1..n).map(move |t| (s, t)))
            .filter(|&(s, t)| tolerance.is_zero(self.get(s, t)));
        EquivalenceRelation::from_pairs(n, pairs)
    }
}

impl fmt::Display for DistanceMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.array.rows() {
            let mut first = true;
            for d in row {
                if !first {
                    write!(f, "\t")?;
                }
                first = false;
                write!(f, "{d:.6}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}


/// Iterative approximation of the bisimilarity distances of a chain.
///
/// # Example
///
/// ```
/// use probisim::{LabelledMarkovChain, Tolerance};
/// use probisim::distance::DistanceIteration;
///
/// let chain = LabelledMarkovChain::from_transitions(
///     vec![0, 0, 1],
///     &[(0, 0, 0.5), (0, 2, 0.5), (1, 1, 1.0), (2, 2, 1.0)],
/// ).unwrap();
/// let mut iteration = DistanceIteration::new(&chain, Tolerance::STANDARD);
/// iteration.run(4);
/// // 0, 0.5, 0.75, 0.875
/// assert!((iteration.current().get(0, 1) - 0.875).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct DistanceIteration<'a> {
    chain: &'a LabelledMarkovChain,
    tolerance: Tolerance,
    current: DistanceMatrix,
    iteration: usize,
    bisimilar: Option<EquivalenceRelation>,
}

impl<'a> DistanceIteration<'a> {
    /// Start from the zero matrix.
    pub fn new(chain: &'a LabelledMarkovChain, tolerance: Tolerance) -> Self {
        DistanceIteration {
            chain,
            tolerance,
            current: DistanceMatrix::zero(chain.n_states()),
            iteration: 0,
            bisimilar: None,
        }
    }

    /// Keep the distance of all pairs related by `bisimilarity` at 0
    /// instead of computing couplings for them.
    ///
    /// Bisimilar states have distance 0 in every approximation,
    /// so this only saves work.
    pub fn skip_bisimilar(mut self, bisimilarity: EquivalenceRelation) -> Self {
        self.bisimilar = Some(bisimilarity);
        self
    }

    /// The latest approximation.
    pub fn current(&self) -> &DistanceMatrix {
        &self.current
    }

    /// Number of steps performed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn into_current(self) -> DistanceMatrix {
        self.current
    }

    /// Compute the next approximation from the current one.
    ///
    /// Returns the largest change of any distance.
    pub fn step(&mut self) -> f64 {
        let n = self.chain.n_states();
        let probability = self.chain.probability();
        let mut next = DistanceMatrix::zero(n);
        for s in 0..n {
            for t in s + 1..n {
                let d = if self.chain.label(s) != self.chain.label(t) {
                    1.0
                } else if self.bisimilar.as_ref().is_some_and(|b| b.equiv(s, t)) {
                    0.0
                } else {
                    OptimalCoupling::new(s, t, probability, self.current.view(), self.tolerance)
                        .compute_distance()
                };
                next.set(s, t, d);
            }
        }
        let change = next.max_difference(&self.current);
        self.current = next;
        self.iteration += 1;
        debug!("Distance iteration {}: largest change {change}", self.iteration);
        change
    }

    /// Perform `n` steps.
    pub fn run(&mut self, n: usize) -> &DistanceMatrix {
        for _ in 0..n {
            self.step();
        }
        &self.current
    }
}
