//! Equivalence relations over states.
//!
//! [`PartitionRefinement`](crate::bisimulation::PartitionRefinement) produces a list of
//! classes, which [`EquivalenceRelation`] keeps together with the class of every state.
//! Relations can also be generated from pairs of related states, for example the pairs
//! at distance zero (see [`DistanceMatrix::kernel()`](crate::distance::DistanceMatrix::kernel)).

use disjoint_sets::UnionFind;
use rustc_hash::FxHashMap;


/// Equivalence relation over states, stored as its list of classes.
///
/// Classes are sorted, and ordered by their smallest state,
/// the same order in which
/// [`bisimilarity_classes()`](crate::LabelledMarkovChain::bisimilarity_classes)
/// returns them.
///
/// **Important:** If the relation was computed on a minimized chain,
/// it refers to the states of that chain.
/// Apply the minimization mapping using
/// [`with_mapping()`](EquivalenceRelation::with_mapping)
/// to get a relation over the original states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceRelation {
    classes: Vec<Vec<u32>>,
    // Index into `classes` for every state
    class_index: Vec<usize>,
}

impl EquivalenceRelation {
    /// Build the relation over `n_states` states from its classes.
    ///
    /// States that do not appear in any class are related only to themselves.
    ///
    /// # Panics
    ///
    /// Panics if a class contains a state `>= n_states`, or if a state appears twice.
    pub fn from_classes(n_states: usize, mut classes: Vec<Vec<u32>>) -> Self {
        let mut covered = vec![false; n_states];
        for &state in classes.iter().flatten() {
            assert!(!covered[state as usize], "State {state} is in more than one class");
            covered[state as usize] = true;
        }
        classes.retain(|class| !class.is_empty());
        classes.extend(covered.iter()
            .enumerate()
            .filter(|(_, c)| !**c)
            .map(|(state, _)| vec![state as u32]));
        for class in &mut classes {
            class.sort_unstable();
        }
        classes.sort_unstable_by_key(|class| class[0]);

        let mut class_index = vec![0; n_states];
        for (index, class) in classes.iter().enumerate() {
            for &state in class {
                class_index[state as usize] = index;
            }
        }
        EquivalenceRelation { classes, class_index }
    }

    /// The smallest equivalence relation over `n_states` states that relates all `pairs`.
    ///
    /// # Panics
    ///
    /// Panics if a pair contains a state `>= n_states`.
    pub fn from_pairs<I: IntoIterator<Item=(usize, usize)>>(n_states: usize, pairs: I) -> Self {
        let mut union = UnionFind::new(n_states);
        for (s, t) in pairs {
            union.union(s, t);
        }
        let mut root_class = FxHashMap::default();
        let mut classes: Vec<Vec<u32>> = Vec::new();
        for state in 0..n_states {
            let index = *root_class.entry(union.find(state)).or_insert_with(|| {
                classes.push(Vec::new());
                classes.len() - 1
            });
            classes[index].push(state as u32);
        }
        // Visiting states in order already yields sorted classes ordered by first state
        Self::from_classes(n_states, classes)
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.class_index.len()
    }

    /// All states, grouped by their equivalence class.
    #[inline]
    pub fn get_classes(&self) -> &[Vec<u32>] {
        &self.classes
    }

    pub fn into_classes(self) -> Vec<Vec<u32>> {
        self.classes
    }

    /// The number of equivalence classes.
    #[inline]
    pub fn count_classes(&self) -> usize {
        self.classes.len()
    }

    /// Position of the class of `state` in [`get_classes()`](EquivalenceRelation::get_classes).
    #[inline]
    pub fn class_index(&self, state: usize) -> usize {
        self.class_index[state]
    }

    /// The equivalence class containing `state`.
    pub fn class_of(&self, state: usize) -> &[u32] {
        &self.classes[self.class_index[state]]
    }

    /// Whether `s` and `t` are related.
    #[inline]
    pub fn equiv(&self, s: usize, t: usize) -> bool {
        self.class_index[s] == self.class_index[t]
    }

    /// Create new EquivalenceRelation accounting for a mapping.
    ///
    /// This mapping could be the one returned by
    /// [`bisimilar_minimize()`](crate::LabelledMarkovChain::bisimilar_minimize),
    /// which maps states to their bisimilarity classes.
    /// Two states are related by the result if the states they are mapped to are related.
    ///
    /// # Example
    ///
    /// ```
    /// # use probisim::equivalence::EquivalenceRelation;
    /// let relation = EquivalenceRelation::from_classes(4, vec![vec![0, 2]]);
    /// let minimization = vec![1, 1, 2, 2, 3, 3, 0, 0];
    ///
    /// // The following two uses are equivalent:
    /// assert_eq!(relation.equiv(minimization[0], minimization[5]),
    ///            relation.with_mapping(&minimization).equiv(0, 5));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if any element of `mapping` is not a state of this relation.
    pub fn with_mapping(&self, mapping: &[usize]) -> Self {
        let mut classes = vec![Vec::new(); self.classes.len()];
        for (state, &minimized) in mapping.iter().enumerate() {
            classes[self.class_index[minimized]].push(state as u32);
        }
        Self::from_classes(mapping.len(), classes)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_classes() {
        let relation = EquivalenceRelation::from_classes(
            6,
            vec![vec![5, 2, 4], vec![3, 0], vec![1]],
        );
        assert_eq!(relation.count_classes(), 3);
        assert!(relation.equiv(0, 3));
        assert!(relation.equiv(5, 2));
        assert!(!relation.equiv(0, 1));
        assert_eq!(relation.get_classes(), vec![vec![0, 3], vec![1], vec![2, 4, 5]]);
        assert_eq!(relation.class_of(4), &[2, 4, 5]);
        assert_eq!(relation.class_index(3), 0);
    }

    #[test]
    fn test_uncovered_states_are_singletons() {
        let relation = EquivalenceRelation::from_classes(5, vec![vec![1, 3], vec![]]);
        assert_eq!(relation.get_classes(), vec![vec![0], vec![1, 3], vec![2], vec![4]]);
        assert_eq!(relation.n_states(), 5);
    }

    #[test]
    #[should_panic]
    fn test_overlapping_classes() {
        EquivalenceRelation::from_classes(3, vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn test_from_pairs() {
        // 0 ~ 4 and 4 ~ 2 imply 0 ~ 2
        let relation = EquivalenceRelation::from_pairs(6, [(0, 4), (4, 2), (5, 3)]);
        assert_eq!(relation.get_classes(), vec![vec![0, 2, 4], vec![1], vec![3, 5]]);
        assert!(relation.equiv(2, 0));

        let identity = EquivalenceRelation::from_pairs(3, []);
        assert_eq!(identity.count_classes(), 3);
        assert_eq!(identity, EquivalenceRelation::from_classes(3, vec![]));
    }

    #[test]
    fn test_with_mapping() {
        let relation = EquivalenceRelation::from_classes(3, vec![vec![0, 2], vec![1]]);
        let mapping = vec![0, 1, 1, 2, 0];
        let mapped = relation.with_mapping(&mapping);
        assert_eq!(mapped.get_classes(), vec![vec![0, 3, 4], vec![1, 2]]);
    }
}
