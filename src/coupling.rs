//! Optimal couplings of the transition distributions of two states.
//!
//! The minimal expected distance under any coupling of two distributions
//! is a transportation problem.
//! It is solved here as a minimum cost flow problem on a bipartite network
//! ([`SupportNetwork`]) by cancelling negative cycles,
//! starting from a feasible flow given by the northwest corner method.

pub mod network;


use std::collections::VecDeque;

use log::trace;
use ndarray::ArrayView2;

use crate::tolerance::Tolerance;
pub use network::{Support, SupportNetwork};

const NONE: usize = usize::MAX;

/// Computes the optimal coupling of the distributions of two states.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use probisim::Tolerance;
/// use probisim::coupling::OptimalCoupling;
///
/// let probability = array![
///     [0.5, 0.5, 0.0],
///     [0.0, 0.5, 0.5],
///     [0.0, 0.0, 1.0],
/// ];
/// let distances = array![
///     [0.0, 0.0, 1.0],
///     [0.0, 0.0, 1.0],
///     [1.0, 1.0, 0.0],
/// ];
/// let coupling = OptimalCoupling::new(0, 1, probability.view(), distances.view(),
///                                     Tolerance::STANDARD);
/// assert!((coupling.compute_distance() - 0.5).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct OptimalCoupling {
    network: SupportNetwork,
    tolerance: Tolerance,
}

impl OptimalCoupling {
    /// Set up the transportation problem between the distributions of states `s` and `t`.
    ///
    /// `probability` is the transition matrix, `distances` a distance matrix over all states.
    ///
    /// # Panics
    ///
    /// Panics if `s` or `t` are not rows of `probability`,
    /// or if `distances` is smaller than the number of states.
    pub fn new(
        s: usize,
        t: usize,
        probability: ArrayView2<f64>,
        distances: ArrayView2<f64>,
        tolerance: Tolerance,
    ) -> Self {
        let network = SupportNetwork::new(probability.row(s), probability.row(t),
                                          distances, tolerance);
        OptimalCoupling {
            network,
            tolerance,
        }
    }

    /// The underlying network with the current flow.
    pub fn network(&self) -> &SupportNetwork {
        &self.network
    }

    /// Cancel negative cycles until the flow is optimal.
    ///
    /// Returns the number of cancelled cycles.
    pub fn compute_optimal_flow(&mut self) -> usize {
        let mut cancelled = 0;
        while let Some((node, pred)) = self.find_negative_cycle() {
            self.cancel(node, &pred);
            cancelled += 1;
        }
        trace!("Optimal flow after cancelling {cancelled} cycles");
        cancelled
    }

    /// Transport cost of the current flow.
    /// After [`compute_optimal_flow()`](OptimalCoupling::compute_optimal_flow),
    /// this is the minimal cost.
    pub fn distance(&self) -> f64 {
        self.network.total_cost()
    }

    /// Compute the optimal flow and return its cost.
    pub fn compute_distance(mut self) -> f64 {
        self.compute_optimal_flow();
        self.distance()
    }

    /// Mass moved from state `u` to state `v` by the current flow.
    pub fn flow(&self, u: usize, v: usize) -> f64 {
        let left = self.network.left.iter().position(|s| s.state == u);
        let right = self.network.right.iter().position(|s| s.state == v);
        match (left, right) {
            (Some(i), Some(j)) => self.network.flow[[i, j]],
            _ => 0.0,
        }
    }

    // Queue based Bellman-Ford search from node 0 in the residual network.
    //
    // Once a node has been dequeued more often than there are nodes,
    // the predecessor graph is checked for a cycle.
    // Any cycle in it has negative cost.
    // Returns a node on such a cycle together with the predecessor graph.
    fn find_negative_cycle(&self) -> Option<(usize, Vec<usize>)> {
        let size = self.network.n_nodes();
        if size == 0 || self.network.right.is_empty() {
            return None;
        }
        let epsilon = self.tolerance.epsilon;
        let mut dist = vec![f64::INFINITY; size];
        let mut pred = vec![NONE; size];
        let mut dequeued = vec![0usize; size];
        let mut queued = vec![false; size];
        let mut queue = VecDeque::new();

        dist[0] = 0.0;
        queue.push_back(0);
        queued[0] = true;
        while let Some(tail) = queue.pop_front() {
            queued[tail] = false;
            dequeued[tail] += 1;
            if dequeued[tail] > size {
                if let Some(node) = predecessor_cycle(&pred) {
                    return Some((node, pred));
                }
            }
            for head in self.network.heads(tail) {
                if !self.tolerance.is_positive(self.network.residual[[tail, head]]) {
                    continue;
                }
                let d = dist[tail] + self.network.cost[[tail, head]];
                // Improvements below epsilon are rounding noise
                if d < dist[head] - epsilon {
                    dist[head] = d;
                    pred[head] = tail;
                    if !queued[head] {
                        queued[head] = true;
                        queue.push_back(head);
                    }
                }
            }
        }
        None
    }

    // Push the bottleneck capacity around the cycle through `node`
    fn cancel(&mut self, node: usize, pred: &[usize]) {
        let mut delta = f64::INFINITY;
        let mut head = node;
        loop {
            let tail = pred[head];
            delta = delta.min(self.network.residual[[tail, head]]);
            head = tail;
            if head == node {
                break;
            }
        }
        debug_assert!(delta >= self.tolerance.epsilon, "Cycle without residual capacity");
        loop {
            let tail = pred[head];
            self.network.push(tail, head, delta);
            head = tail;
            if head == node {
                break;
            }
        }
    }
}

// Find a node on a cycle of the predecessor graph, if there is any.
fn predecessor_cycle(pred: &[usize]) -> Option<usize> {
    let mut stamp = vec![NONE; pred.len()];
    for start in 0..pred.len() {
        let mut node = start;
        while node != NONE && stamp[node] == NONE {
            stamp[node] = start;
            node = pred[node];
        }
        if node != NONE && stamp[node] == start {
            return Some(node);
        }
    }
    None
}
