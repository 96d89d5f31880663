//! Deciding probabilistic bisimilarity by partition refinement.
//!
//! This is the lumping algorithm described by S. Derisavi, H. Hermanns and W. H. Sanders in
//! "Optimal State-Space Lumping in Markov Chains", 2003.
//! States are grouped by label first.
//! Then blocks are repeatedly split by the probability mass with which their states
//! move into a splitter block, until no block can be split any further.

mod splay;

use std::collections::VecDeque;
use std::mem;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::LabelledMarkovChain;
use crate::tolerance::Tolerance;
use splay::SplayTree;

#[derive(Debug, Clone, Copy)]
struct State {
    block: usize,
    // Index into the element list of `block`
    position: usize,
    // Mass into the current splitter
    sum: f64,
}

#[derive(Debug, Clone, Default)]
struct Block {
    elements: Vec<u32>,
    // Sub-blocks of this block, keyed by mass into the current splitter.
    // Only populated during a single splitting step.
    tree: SplayTree<usize>,
}

/// Partition refinement engine for one labelled Markov chain.
///
/// # Example
///
/// ```
/// use probisim::{LabelledMarkovChain, Tolerance};
/// use probisim::bisimulation::PartitionRefinement;
///
/// let chain = LabelledMarkovChain::from_transitions(
///     vec![0, 0, 1],
///     &[(0, 2, 1.0), (1, 2, 1.0), (2, 2, 1.0)],
/// ).unwrap();
/// let classes = PartitionRefinement::new(&chain, Tolerance::from_precision(6)).decide();
/// assert_eq!(classes.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PartitionRefinement {
    states: Vec<State>,
    // Incoming transitions for each state: (source, probability)
    predecessors: Vec<Vec<(u32, f64)>>,
    blocks: Vec<Block>,
    tolerance: Tolerance,
}

impl PartitionRefinement {
    /// Set up the initial partition, with one block for each label.
    pub fn new(chain: &LabelledMarkovChain, tolerance: Tolerance) -> Self {
        let n = chain.n_states();
        let mut blocks: Vec<Block> = Vec::new();
        let mut label_block: FxHashMap<i32, usize> = FxHashMap::default();
        let mut states = Vec::with_capacity(n);
        for (state, label) in chain.labels().iter().enumerate() {
            let block = *label_block.entry(*label).or_insert_with(|| {
                blocks.push(Block::default());
                blocks.len() - 1
            });
            let elements = &mut blocks[block].elements;
            states.push(State { block, position: elements.len(), sum: 0.0 });
            elements.push(state as u32);
        }

        let mut predecessors = vec![Vec::new(); n];
        for source in 0..n {
            for (target, probability) in chain.successors(source) {
                predecessors[target].push((source as u32, probability));
            }
        }

        PartitionRefinement {
            states,
            predecessors,
            blocks,
            tolerance,
        }
    }

    /// Run the refinement to completion.
    ///
    /// Returns the bisimilarity classes. Each class is sorted,
    /// classes are ordered by their smallest state.
    pub fn decide(mut self) -> Vec<Vec<u32>> {
        let mut worklist: VecDeque<usize> = (0..self.blocks.len()).collect();
        let mut scheduled = vec![true; self.blocks.len()];
        let mut touched: Vec<u32> = Vec::new();
        let mut is_touched = vec![false; self.states.len()];
        let mut partitioned: Vec<usize> = Vec::new();
        let mut steps = 0;

        while let Some(splitter) = worklist.pop_front() {
            // Entries can be stale after a block was taken out of the worklist
            if !mem::replace(&mut scheduled[splitter], false) {
                continue;
            }
            steps += 1;

            self.accumulate_sums(splitter, &mut touched, &mut is_touched);
            self.split(&touched, &mut partitioned, &mut scheduled);
            for &state in &touched {
                is_touched[state as usize] = false;
            }

            for &block in &partitioned {
                let sub_blocks: Vec<usize> = self.blocks[block].tree.values().collect();
                trace!("Block {block} split into {} sub-blocks by splitter {splitter}",
                       sub_blocks.len());
                let mut largest = block;
                for &sub in &sub_blocks {
                    schedule(&mut worklist, &mut scheduled, sub);
                    if self.blocks[sub].elements.len() > self.blocks[largest].elements.len() {
                        largest = sub;
                    }
                }
                // The largest part can be left out, unless the old block still has to be
                // processed as a whole.
                if !scheduled[block] && largest != block {
                    schedule(&mut worklist, &mut scheduled, block);
                    scheduled[largest] = false;
                }
                if self.blocks[block].elements.is_empty() {
                    scheduled[block] = false;
                }
                self.blocks[block].tree.clear();
            }
        }

        let classes = self.classes();
        debug!("Partition refinement finished after {steps} splitter steps with {} blocks",
               classes.len());
        classes
    }

    // Compute, for every state with a transition into `splitter`,
    // its total probability of moving into `splitter`.
    fn accumulate_sums(&mut self, splitter: usize, touched: &mut Vec<u32>, is_touched: &mut [bool]) {
        touched.clear();
        for &state in &self.blocks[splitter].elements {
            for &(source, probability) in &self.predecessors[state as usize] {
                let s = &mut self.states[source as usize];
                if !is_touched[source as usize] {
                    is_touched[source as usize] = true;
                    s.sum = 0.0;
                    touched.push(source);
                }
                s.sum += probability;
            }
        }
    }

    // Move all touched states out of their block into the sub-block for their mass.
    // The blocks that lost states are collected in `partitioned`.
    fn split(&mut self, touched: &[u32], partitioned: &mut Vec<usize>, scheduled: &mut Vec<bool>) {
        partitioned.clear();
        let epsilon = self.tolerance.epsilon;
        for &state in touched {
            let State { block, sum, .. } = self.states[state as usize];
            // Mass that is numerically zero is the same as no transition
            if self.tolerance.is_zero(sum) {
                continue;
            }
            if self.blocks[block].tree.is_empty() {
                partitioned.push(block);
            }
            let candidate = self.blocks.len();
            let (sub, created) = self.blocks[block].tree.insert(sum, epsilon, candidate);
            if created {
                self.blocks.push(Block::default());
                scheduled.push(false);
            }
            self.detach(state);
            self.attach(state, sub);
        }
    }

    fn detach(&mut self, state: u32) {
        let State { block, position, .. } = self.states[state as usize];
        let elements = &mut self.blocks[block].elements;
        elements.swap_remove(position);
        if let Some(&moved) = elements.get(position) {
            self.states[moved as usize].position = position;
        }
    }

    fn attach(&mut self, state: u32, block: usize) {
        let elements = &mut self.blocks[block].elements;
        let s = &mut self.states[state as usize];
        s.block = block;
        s.position = elements.len();
        elements.push(state);
    }

    fn classes(&self) -> Vec<Vec<u32>> {
        let mut classes: Vec<Vec<u32>> = self.blocks.iter()
            .filter(|block| !block.elements.is_empty())
            .map(|block| {
                let mut class = block.elements.clone();
                class.sort_unstable();
                class
            })
            .collect();
        classes.sort_unstable_by_key(|class| class[0]);
        classes
    }
}

fn schedule(worklist: &mut VecDeque<usize>, scheduled: &mut [bool], block: usize) {
    if !scheduled[block] {
        scheduled[block] = true;
        worklist.push_back(block);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn decide(chain: &LabelledMarkovChain, precision: i32) -> Vec<Vec<u32>> {
        PartitionRefinement::new(chain, Tolerance::from_precision(precision)).decide()
    }

    // Signature refinement: repeatedly split by (label, mass into every block)
    // until the number of blocks stays the same.
    fn naive_refinement(chain: &LabelledMarkovChain, precision: i32) -> Vec<Vec<u32>> {
        let n = chain.n_states();
        let scale = 10f64.powi(precision);
        let mut partition: Vec<usize> = vec![0; n];
        let mut prev_count = 0;
        let mut new_count = 1;
        while prev_count != new_count {
            prev_count = new_count;
            let signatures: Vec<(i32, Vec<i64>)> = (0..n).map(|s| {
                    let mut mass = vec![0.0; prev_count];
                    for (t, p) in chain.successors(s) {
                        mass[partition[t]] += p;
                    }
                    let rounded = mass.iter().map(|m| (m * scale).round() as i64).collect();
                    (chain.label(s), rounded)
                })
                .collect();
            let mut sigmap = FxHashMap::default();
            new_count = 0;
            for sig in &signatures {
                sigmap.entry(sig).or_insert_with(|| {
                    new_count += 1;
                    new_count - 1
                });
            }
            for (part, sig) in partition.iter_mut().zip(&signatures) {
                *part = sigmap[&sig];
            }
        }
        let mut classes = vec![Vec::new(); new_count];
        for (s, part) in partition.iter().enumerate() {
            classes[*part].push(s as u32);
        }
        classes.sort_unstable_by_key(|class| class[0]);
        classes
    }

    // Deterministic pseudo-random chain with 1 to 4 successors per state
    // and integer weights, so that masses into a block take many distinct values.
    fn generated_chain(n: usize, n_labels: i32, seed: u64) -> LabelledMarkovChain {
        let mut x = seed;
        let mut next = move || {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x
        };
        let labels = (0..n).map(|_| (next() % n_labels as u64) as i32).collect();
        let mut transitions = Vec::new();
        for s in 0..n {
            let successors = (next() % 4 + 1) as usize;
            let weights: Vec<u64> = (0..successors).map(|_| next() % 4 + 1).collect();
            let total: u64 = weights.iter().sum();
            for w in weights {
                let target = (next() % n as u64) as u32;
                transitions.push((s as u32, target, w as f64 / total as f64));
            }
        }
        LabelledMarkovChain::from_transitions(labels, &transitions).unwrap()
    }

    #[test]
    fn test_identical_states() {
        let chain = LabelledMarkovChain::from_transitions(
            vec![4, 4, 4, 4],
            &[
                (0, 1, 0.5), (0, 2, 0.5),
                (1, 1, 0.5), (1, 2, 0.5),
                (2, 1, 0.5), (2, 2, 0.5),
                (3, 1, 0.5), (3, 2, 0.5),
            ],
        ).unwrap();
        assert_eq!(decide(&chain, 6), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_distinct_labels() {
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 1, 2],
            &[(0, 1, 1.0), (1, 2, 1.0), (2, 0, 1.0)],
        ).unwrap();
        assert_eq!(decide(&chain, 6), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_split_by_mass() {
        // 0 and 1 both reach label 1 with probability 1/2, 2 only with 1/4
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 0, 0, 1, 2],
            &[
                (0, 3, 0.5), (0, 4, 0.5),
                (1, 4, 0.5), (1, 3, 0.5),
                (2, 3, 0.25), (2, 4, 0.75),
                (3, 3, 1.0),
                (4, 4, 1.0),
            ],
        ).unwrap();
        assert_eq!(decide(&chain, 6), vec![vec![0, 1], vec![2], vec![3], vec![4]]);
    }

    #[test]
    fn test_split_propagates_backwards() {
        // 2 and 3 differ only after two steps
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 0, 0, 0, 1],
            &[
                (0, 4, 1.0),
                (1, 1, 1.0),
                (2, 0, 1.0),
                (3, 1, 1.0),
                (4, 4, 1.0),
            ],
        ).unwrap();
        assert_eq!(decide(&chain, 6), vec![vec![0], vec![1, 3], vec![2], vec![4]]);
    }

    #[test]
    fn test_precision() {
        // Masses 0.5 and 0.5004 only differ at precision 4
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 0, 1, 2],
            &[
                (0, 2, 0.5), (0, 3, 0.5),
                (1, 2, 0.5004), (1, 3, 0.4996),
                (2, 2, 1.0),
                (3, 3, 1.0),
            ],
        ).unwrap();
        assert_eq!(decide(&chain, 3), vec![vec![0, 1], vec![2], vec![3]]);
        assert_eq!(decide(&chain, 4), vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_negligible_mass_is_no_transition() {
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 0, 1],
            &[
                (0, 0, 1.0),
                (1, 1, 1.0 - 1e-13), (1, 2, 1e-13),
                (2, 2, 1.0),
            ],
        ).unwrap();
        assert_eq!(decide(&chain, 8), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_scenario() {
        let chain = LabelledMarkovChain::from_transitions(
            vec![0, 0, 1, 2, 3],
            &[
                (0, 0, 0.33), (0, 2, 0.33), (0, 3, 0.33),
                (1, 1, 0.5), (1, 3, 0.25), (1, 4, 0.25),
                (2, 2, 1.0),
                (3, 3, 1.0),
                (4, 4, 1.0),
            ],
        ).unwrap();
        assert_eq!(decide(&chain, 10), vec![vec![0], vec![1], vec![2], vec![3], vec![4]]);
    }

    #[test]
    fn test_against_signature_refinement() {
        for seed in 1..=200 {
            let n = 5 + (seed as usize * 13) % 60;
            let n_labels = 1 + (seed % 3) as i32;
            let chain = generated_chain(n, n_labels, seed * 7919);
            assert_eq!(decide(&chain, 6), naive_refinement(&chain, 6), "seed {seed}");
        }
    }

    #[test]
    fn test_empty_chain() {
        let chain = LabelledMarkovChain::from_transitions(vec![], &[]).unwrap();
        assert!(decide(&chain, 6).is_empty());
    }
}
