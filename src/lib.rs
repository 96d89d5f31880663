//! Probabilistic bisimilarity and bisimilarity distances for labelled Markov chains.
//!
//! A labelled Markov chain assigns a label to each state and a probability
//! distribution over successor states to each state.
//! Two states are *probabilistic bisimilar* if they have the same label and,
//! for every bisimilarity class, the same probability of moving into that class.
//! The *bisimilarity distance* relaxes this to a number in `[0, 1]`,
//! which is 0 exactly for bisimilar states.
//!
//! This crate implements
//!
//! * the partition refinement algorithm by Derisavi, Hermanns and Sanders
//!   for deciding bisimilarity, see [`bisimulation`],
//! * the computation of optimal couplings by cancelling negative cycles
//!   in a transportation network, see [`coupling`],
//! * the iterative approximation of the bisimilarity distances, see [`distance`].
//!
//! # Usage
//!
//! Most of this crate's functionality can be accessed through the
//! [`LabelledMarkovChain`] struct.
//!
//! ```
//! use probisim::LabelledMarkovChain;
//!
//! // States 0 and 1 both reach the state labelled 1 with probability 1/2.
//! // State 2 only with probability 1/4.
//! let chain = LabelledMarkovChain::from_transitions(
//!     vec![0, 0, 0, 1],
//!     &[
//!         (0, 0, 0.5), (0, 3, 0.5),
//!         (1, 2, 0.5), (1, 3, 0.5),
//!         (2, 2, 0.75), (2, 3, 0.25),
//!         (3, 3, 1.0),
//!     ],
//! ).unwrap();
//!
//! let bisimilarity = chain.bisimilarity(6);
//! assert!(!bisimilarity.equiv(0, 2));
//! assert_eq!(bisimilarity.count_classes(), 4);
//!
//! let distances = chain.distances(20);
//! assert!(distances.get(0, 2) > 0.0);
//! assert_eq!(distances.get(0, 3), 1.0);
//! ```
//!
//! # Serde
//!
//! When compiled with the feature flag `serde` (disabled by default),
//! [`LabelledMarkovChain`], [`DistanceMatrix`](distance::DistanceMatrix) and [`Tolerance`]
//! implement serde's `Serialize` and `Deserialize` traits.

pub mod bisimulation;
pub mod coupling;
pub mod distance;
pub mod equivalence;
mod error;
mod tolerance;

// Re-exports
pub use error::*;
pub use tolerance::Tolerance;

use std::fs;
use std::path::Path;
use std::result;

use ndarray::{Array2, ArrayView1, ArrayView2};

use bisimulation::PartitionRefinement;
use coupling::OptimalCoupling;
use distance::{DistanceIteration, DistanceMatrix};
use equivalence::EquivalenceRelation;

/// A transition from one state to another with a probability.
pub type Transition = (u32, u32, f64);

/// Labelled Markov chain.
///
/// The transition probabilities are stored as a dense matrix,
/// where row `s` is the distribution over successors of state `s`.
///
/// # Creation
///
/// A chain can be built from a label list and a list of transitions:
///
/// ```
/// use probisim::LabelledMarkovChain;
///
/// let chain = LabelledMarkovChain::from_transitions(
///     vec![0, 1],
///     &[(0, 0, 0.5), (0, 1, 0.5), (1, 1, 1.0)],
/// ).unwrap();
/// assert_eq!(chain.n_states(), 2);
/// ```
///
/// Chains can also be read from files,
/// see [`from_files()`](LabelledMarkovChain::from_files).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelledMarkovChain {
    labels: Vec<i32>,
    probability: Array2<f64>,
}

impl LabelledMarkovChain {
    /// Create a chain from its labels and transition matrix.
    ///
    /// Only the dimensions are checked.
    /// Use [`check_stochastic()`](LabelledMarkovChain::check_stochastic)
    /// to validate the probabilities.
    pub fn new(labels: Vec<i32>, probability: Array2<f64>) -> Result<Self> {
        let (rows, columns) = probability.dim();
        if rows != columns {
            return Err(Error::NotSquare { rows, columns });
        }
        if labels.len() != rows {
            return Err(Error::LabelCount { states: rows, labels: labels.len() });
        }
        Ok(LabelledMarkovChain { labels, probability })
    }

    /// Create a chain with one state per label from a list of transitions.
    ///
    /// Probabilities of repeated transitions are added up.
    pub fn from_transitions(labels: Vec<i32>, transitions: &[Transition]) -> Result<Self> {
        let n = labels.len();
        let mut probability = Array2::zeros((n, n));
        for &(source, target, p) in transitions {
            for state in [source as usize, target as usize] {
                if state >= n {
                    return Err(Error::StateOutOfRange { state, states: n });
                }
            }
            probability[[source as usize, target as usize]] += p;
        }
        Self::new(labels, probability)
    }

    /// Read a chain from a transitions file and a labels file.
    ///
    /// The transitions file starts with the number of states and the number of transitions,
    /// followed by one `source target probability` triple for each transition.
    /// The labels file contains one integer label for each state.
    /// All values are separated by whitespace. For example:
    ///
    /// ```text
    /// 3 4
    /// 0 1 0.5
    /// 0 2 0.5
    /// 1 1 1.0
    /// 2 2 1.0
    /// ```
    ///
    /// # Errors
    ///
    /// A [`ParseError`] is returned if a file can not be read,
    /// contains too few or malformed values,
    /// or if the transitions do not form a labelled Markov chain
    /// (see [`check_stochastic()`](LabelledMarkovChain::check_stochastic)).
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        transitions: P,
        labels: Q,
    ) -> result::Result<Self, ParseError> {
        let transitions = fs::read_to_string(transitions)?;
        let labels = fs::read_to_string(labels)?;
        Self::from_strs(&transitions, &labels)
    }

    /// Parse a chain from the contents of a transitions file and a labels file.
    /// The format is described at [`from_files()`](LabelledMarkovChain::from_files).
    pub fn from_strs(transitions: &str, labels: &str) -> result::Result<Self, ParseError> {
        let mut values = transitions.split_whitespace();
        let mut next = || values.next().ok_or(ParseError::MissingField);
        let n: usize = next()?.parse()?;
        let n_transitions: usize = next()?.parse()?;
        let mut edges = Vec::with_capacity(n_transitions);
        for _ in 0..n_transitions {
            let source: u32 = next()?.parse()?;
            let target: u32 = next()?.parse()?;
            let p: f64 = next()?.parse()?;
            edges.push((source, target, p));
        }

        let mut values = labels.split_whitespace();
        let labels = (0..n)
            .map(|_| -> result::Result<i32, ParseError> {
                Ok(values.next().ok_or(ParseError::MissingField)?.parse()?)
            })
            .collect::<result::Result<Vec<i32>, ParseError>>()?;

        let chain = Self::from_transitions(labels, &edges)?;
        chain.check_stochastic(Tolerance::from_precision(6))?;
        Ok(chain)
    }

    /// Check that all probabilities are non-negative
    /// and that every row sums to 1 up to `tolerance`.
    pub fn check_stochastic(&self, tolerance: Tolerance) -> Result<()> {
        for (state, row) in self.probability.rows().into_iter().enumerate() {
            if let Some(target) = row.iter().position(|p| *p < 0.0) {
                return Err(Error::NegativeProbability { source: state, target });
            }
            let sum = row.sum();
            if !tolerance.eq(sum, 1.0) {
                return Err(Error::NotStochastic { state, sum });
            }
        }
        Ok(())
    }

    /// The number of states in this chain.
    #[inline]
    pub fn n_states(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn label(&self, state: usize) -> i32 {
        self.labels[state]
    }

    #[inline]
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// The full transition matrix.
    #[inline]
    pub fn probability(&self) -> ArrayView2<'_, f64> {
        self.probability.view()
    }

    /// The distribution over successors of `state`.
    ///
    /// # Panics
    ///
    /// Panics if `state` is outside the range of states of this chain.
    #[inline]
    pub fn distribution(&self, state: usize) -> ArrayView1<'_, f64> {
        self.probability.row(state)
    }

    /// All successors of `state` with positive probability.
    pub fn successors(&self, state: usize) -> impl Iterator<Item=(usize, f64)> + '_ {
        self.probability.row(state)
            .into_iter()
            .enumerate()
            .filter(|(_, p)| **p > 0.0)
            .map(|(target, p)| (target, *p))
    }

    /// Compute the bisimilarity classes, comparing probabilities up to
    /// `precision` decimal digits.
    pub fn bisimilarity_classes(&self, precision: i32) -> Vec<Vec<u32>> {
        PartitionRefinement::new(self, Tolerance::from_precision(precision)).decide()
    }

    /// Compute probabilistic bisimilarity as an equivalence relation.
    ///
    /// Probabilities are compared up to `precision` decimal digits.
    pub fn bisimilarity(&self, precision: i32) -> EquivalenceRelation {
        EquivalenceRelation::from_classes(self.n_states(), self.bisimilarity_classes(precision))
    }

    /// Create a new, minimized chain where bisimilar states are consolidated.
    ///
    /// Returns a tuple containing the minimized chain and the mapping from original states
    /// to the state in the minimized chain that covers its bisimilarity class.
    pub fn bisimilar_minimize(&self, precision: i32) -> (LabelledMarkovChain, Vec<usize>) {
        let bisimilarity = self.bisimilarity(precision);
        let count = bisimilarity.count_classes();
        let mapping: Vec<usize> = (0..self.n_states())
            .map(|state| bisimilarity.class_index(state))
            .collect();
        let mut labels = Vec::with_capacity(count);
        let mut probability = Array2::zeros((count, count));
        for (class, states) in bisimilarity.get_classes().iter().enumerate() {
            // Any member represents its class
            let representative = states[0] as usize;
            labels.push(self.labels[representative]);
            for (target, p) in self.successors(representative) {
                probability[[class, mapping[target]]] += p;
            }
        }
        (LabelledMarkovChain { labels, probability }, mapping)
    }

    /// Cost of an optimal coupling of the distributions of `s` and `t` under `distances`.
    ///
    /// # Panics
    ///
    /// Panics if `s` or `t` are outside the range of states of this chain,
    /// or if `distances` has fewer states.
    pub fn coupling_distance(&self, s: usize, t: usize, distances: &DistanceMatrix) -> f64 {
        OptimalCoupling::new(s, t, self.probability(), distances.view(), Tolerance::STANDARD)
            .compute_distance()
    }

    /// Approximate the bisimilarity distances by `n` iterations, starting from the zero matrix.
    pub fn distances(&self, n: usize) -> DistanceMatrix {
        let mut iteration = DistanceIteration::new(self, Tolerance::STANDARD);
        iteration.run(n);
        iteration.into_current()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_dimensions() {
        assert_eq!(LabelledMarkovChain::new(vec![0, 1], Array2::zeros((2, 3))),
                   Err(Error::NotSquare { rows: 2, columns: 3 }));
        assert_eq!(LabelledMarkovChain::new(vec![0], Array2::zeros((2, 2))),
                   Err(Error::LabelCount { states: 2, labels: 1 }));
        assert_eq!(LabelledMarkovChain::from_transitions(vec![0, 0], &[(0, 2, 1.0)]),
                   Err(Error::StateOutOfRange { state: 2, states: 2 }));
    }

    #[test]
    fn test_from_transitions() {
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 1, 1],
            &[(0, 1, 0.25), (0, 2, 0.5), (0, 1, 0.25), (1, 1, 1.0), (2, 2, 1.0)],
        ).unwrap();
        assert_eq!(chain.distribution(0).to_vec(), vec![0.0, 0.5, 0.5]);
        assert_eq!(chain.successors(0).collect::<Vec<_>>(), vec![(1, 0.5), (2, 0.5)]);
        assert_eq!(chain.label(2), 1);
        assert!(chain.check_stochastic(Tolerance::STANDARD).is_ok());
    }

    #[test]
    fn test_check_stochastic() {
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 0],
            &[(0, 0, 0.5), (0, 1, 0.4), (1, 1, 1.0)],
        ).unwrap();
        assert!(matches!(chain.check_stochastic(Tolerance::STANDARD),
                         Err(Error::NotStochastic { state: 0, .. })));
        assert!(chain.check_stochastic(Tolerance::new(0.2)).is_ok());

        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 0],
            &[(0, 0, 1.5), (0, 1, -0.5), (1, 1, 1.0)],
        ).unwrap();
        assert_eq!(chain.check_stochastic(Tolerance::STANDARD),
                   Err(Error::NegativeProbability { source: 0, target: 1 }));
    }

    #[test]
    fn test_from_strs() {
        let chain = LabelledMarkovChain::from_strs(
            "3 4\n0 1 0.5\n0 2 0.5\n1 1 1.0\n2 2 1.0\n",
            "0\n1\n1\n",
        ).unwrap();
        assert_eq!(chain.n_states(), 3);
        assert_eq!(chain.labels(), &[0, 1, 1]);
        assert_eq!(chain.distribution(0).to_vec(), vec![0.0, 0.5, 0.5]);

        assert!(matches!(LabelledMarkovChain::from_strs("3 4\n0 1 0.5\n", "0 1 1"),
                         Err(ParseError::MissingField)));
        assert!(matches!(LabelledMarkovChain::from_strs("2 1\n0 x 1.0\n", "0 1"),
                         Err(ParseError::ParseIntError(_))));
        assert!(matches!(LabelledMarkovChain::from_strs("2 2\n0 1 1.0\n1 1 0.3\n", "0 1"),
                         Err(ParseError::InvalidChain(Error::NotStochastic { state: 1, .. }))));
    }

    #[test]
    fn test_bisimilar_minimize() {
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 0, 0, 1],
            &[
                (0, 0, 0.5), (0, 3, 0.5),
                (1, 2, 0.5), (1, 3, 0.5),
                (2, 1, 0.5), (2, 3, 0.5),
                (3, 3, 1.0),
            ],
        ).unwrap();
        let (minimized, mapping) = chain.bisimilar_minimize(6);
        assert_eq!(mapping, vec![0, 0, 0, 1]);
        assert_eq!(minimized.labels(), &[0, 1]);
        assert_eq!(minimized.distribution(0).to_vec(), vec![0.5, 0.5]);
        assert_eq!(minimized.distribution(1).to_vec(), vec![0.0, 1.0]);
        assert_eq!(minimized.bisimilarity(6).count_classes(), 2);
    }
}
