use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::tolerance::Tolerance;

/// A state in the support of a distribution together with its probability mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Support {
    pub state: usize,
    pub mass: f64,
}

/// Bipartite transportation network between the supports of two distributions.
///
/// Nodes `0..n` are the left side (support of the first distribution),
/// nodes `n..n + m` the right side.
/// Every pair of a left and a right node is connected by a forward arc `left -> right`
/// with capacity 1 and cost equal to the distance between the underlying states,
/// and a backward arc `right -> left` with the negated cost.
#[derive(Debug, Clone)]
pub struct SupportNetwork {
    pub left: Vec<Support>,
    pub right: Vec<Support>,
    // (n + m) x (n + m), indexed by node
    pub cost: Array2<f64>,
    // (n + m) x (n + m), indexed by node
    pub residual: Array2<f64>,
    // n x m, flow on the forward arc from left i to right j
    pub flow: Array2<f64>,
}

// Upper bound of the flow on a forward arc
const ARC_CAPACITY: f64 = 1.0;

impl SupportNetwork {
    /// Build the network for the two distributions,
    /// initialized with the flow of the northwest corner method.
    pub fn new(
        from: ArrayView1<f64>,
        to: ArrayView1<f64>,
        distances: ArrayView2<f64>,
        tolerance: Tolerance,
    ) -> Self {
        let left = support(from, tolerance);
        let right = support(to, tolerance);
        let n = left.len();
        let m = right.len();

        let mut cost = Array2::zeros((n + m, n + m));
        for (i, l) in left.iter().enumerate() {
            for (j, r) in right.iter().enumerate() {
                let d = distances[[l.state, r.state]];
                cost[[i, n + j]] = d;
                cost[[n + j, i]] = -d;
            }
        }

        let flow = northwest_corner(&left, &right, tolerance);

        let mut residual = Array2::zeros((n + m, n + m));
        for i in 0..n {
            for j in 0..m {
                residual[[i, n + j]] = ARC_CAPACITY - flow[[i, j]];
                residual[[n + j, i]] = flow[[i, j]];
            }
        }

        SupportNetwork {
            left,
            right,
            cost,
            residual,
            flow,
        }
    }

    /// Total number of nodes, left and right.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.left.len() + self.right.len()
    }

    #[inline]
    pub fn is_left(&self, node: usize) -> bool {
        node < self.left.len()
    }

    /// All nodes that `node` has an arc to.
    #[inline]
    pub fn heads(&self, node: usize) -> std::ops::Range<usize> {
        if self.is_left(node) {
            self.left.len() .. self.n_nodes()
        } else {
            0 .. self.left.len()
        }
    }

    /// Send `amount` along the arc `tail -> head`.
    pub fn push(&mut self, tail: usize, head: usize, amount: f64) {
        self.residual[[tail, head]] -= amount;
        self.residual[[head, tail]] += amount;
        let n = self.left.len();
        if self.is_left(tail) {
            self.flow[[tail, head - n]] += amount;
        } else {
            self.flow[[head, tail - n]] -= amount;
        }
    }

    /// Transport cost of the current flow.
    pub fn total_cost(&self) -> f64 {
        let n = self.left.len();
        self.flow.indexed_iter()
            .map(|((i, j), f)| f * self.cost[[i, n + j]])
            .sum()
    }
}

// States with positive probability, in index order
fn support(distribution: ArrayView1<f64>, tolerance: Tolerance) -> Vec<Support> {
    distribution.iter()
        .enumerate()
        .filter(|(_, p)| !tolerance.is_zero(**p))
        .map(|(state, &mass)| Support { state, mass })
        .collect()
}

/// Initial feasible flow by the northwest corner method.
///
/// Frank Hitchcock. The Distribution of a Product from Several Sources to Numerous Localities.
/// Studies in Applied Mathematics, 20(1/4): 224-230, 1941.
fn northwest_corner(left: &[Support], right: &[Support], tolerance: Tolerance) -> Array2<f64> {
    let mut flow = Array2::zeros((left.len(), right.len()));
    let mut row: Vec<f64> = left.iter().map(|s| s.mass).collect();
    let mut column: Vec<f64> = right.iter().map(|s| s.mass).collect();
    let mut i = 0;
    let mut j = 0;
    while i < left.len() && j < right.len() {
        let amount = row[i].min(column[j]);
        flow[[i, j]] = amount;
        row[i] -= amount;
        column[j] -= amount;
        // On ties both sides are exhausted
        let row_done = tolerance.is_zero(row[i]);
        let column_done = tolerance.is_zero(column[j]);
        if row_done {
            i += 1;
        }
        if column_done {
            j += 1;
        }
    }
    flow
}
