// Approximate the bisimilarity distances of a small chain and watch them converge.

use probisim::{LabelledMarkovChain, Result, Tolerance};
use probisim::distance::DistanceIteration;

fn run() -> Result<()> {
    // A die simulated by a fair coin (Knuth and Yao) next to a slightly biased one.
    // Labels: 0 => flipping, 1..=6 => outcome
    let mut transitions = vec![
        (0, 1, 0.5), (0, 2, 0.5),
        (1, 3, 0.5), (1, 4, 0.5),
        (2, 5, 0.5), (2, 6, 0.5),
        (3, 1, 0.5), (3, 7, 0.5),
        (4, 8, 0.5), (4, 9, 0.5),
        (5, 10, 0.5), (5, 11, 0.5),
        (6, 12, 0.5), (6, 2, 0.5),

        (13, 14, 0.6), (13, 15, 0.4),
        (14, 16, 0.6), (14, 17, 0.4),
        (15, 18, 0.6), (15, 19, 0.4),
        (16, 14, 0.6), (16, 7, 0.4),
        (17, 8, 0.6), (17, 9, 0.4),
        (18, 10, 0.6), (18, 11, 0.4),
        (19, 12, 0.6), (19, 15, 0.4),
    ];
    // Outcomes are absorbing
    transitions.extend((7..=12).map(|s| (s, s, 1.0)));
    let mut labels = vec![0; 20];
    for (state, outcome) in (7..=12).zip(1..) {
        labels[state] = outcome;
    }

    let chain = LabelledMarkovChain::from_transitions(labels, &transitions)?;
    chain.check_stochastic(Tolerance::STANDARD)?;
    let bisimilarity = chain.bisimilarity(6);
    println!("Fair and biased die bisimilar: {}", bisimilarity.equiv(0, 13));

    let mut iteration = DistanceIteration::new(&chain, Tolerance::STANDARD);
    loop {
        let change = iteration.step();
        println!("Iteration {:3}: distance {:.6}, largest change {change:.2e}",
                 iteration.iteration(), iteration.current().get(0, 13));
        if change < 1e-6 {
            break;
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
