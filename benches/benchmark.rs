use probisim::*;
use probisim::distance::{DistanceIteration, DistanceMatrix};

use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId,
                PlotConfiguration, AxisScale};

// Deterministic pseudo random chains, so that runs are comparable.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn random_chain(n_states: u32, out_degree: u32, n_labels: u64, seed: u64) -> LabelledMarkovChain {
    let mut rng = XorShift(seed);
    let labels = (0..n_states).map(|_| rng.below(n_labels) as i32).collect();
    let mut transitions = Vec::new();
    for source in 0..n_states {
        let weights: Vec<u64> = (0..out_degree).map(|_| rng.below(100) + 1).collect();
        let total: u64 = weights.iter().sum();
        for w in weights {
            let target = rng.below(n_states as u64) as u32;
            transitions.push((source, target, w as f64 / total as f64));
        }
    }
    LabelledMarkovChain::from_transitions(labels, &transitions).unwrap()
}

fn bisimilarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("bisimilarity");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    for n_states in [100, 1000, 10000] {
        let chain = random_chain(n_states, 4, 2, 0x2545f4914f6cdd1d);
        group.bench_with_input(BenchmarkId::new("refinement", n_states),
            &chain,
            |b, chain| b.iter(|| chain.bisimilarity_classes(6)),
        );
    }
    group.finish();
}

fn distances(c: &mut Criterion) {
    let mut group = c.benchmark_group("distances");
    for n_states in [10, 30, 60] {
        let chain = random_chain(n_states, 5, 2, 0x9e3779b97f4a7c15);
        let labels = DistanceMatrix::from_labels(chain.labels());
        group.bench_with_input(BenchmarkId::new("coupling", n_states),
            &chain,
            |b, chain| b.iter(|| chain.coupling_distance(0, 1, &labels)),
        );
        group.bench_with_input(BenchmarkId::new("iteration step", n_states),
            &chain,
            |b, chain| b.iter(|| {
                let mut iteration = DistanceIteration::new(chain, Tolerance::STANDARD);
                iteration.run(2);
                iteration.into_current()
            }),
        );
    }
    group.finish();
}

criterion_group!(benches, bisimilarity, distances);
criterion_main!(benches);
