// Decide probabilistic bisimilarity of a chain read from a transitions and a labels file,
// then minimize the chain.
//
// Example usage:
// `cargo run --example bisimilarity -- chain.tra chain.lab`

use std::ffi::OsStr;
use std::env;
use std::io;
use std::time::Instant;

use probisim::*;

fn minimize(transitions: &OsStr, labels: &OsStr) -> io::Result<()> {
    let chain = LabelledMarkovChain::from_files(transitions, labels)?;
    println!("Number of states: {}", chain.n_states());

    let now = Instant::now();
    let (minimized, mapping) = chain.bisimilar_minimize(6);
    println!("Minimized in {:.5}s", now.elapsed().as_secs_f64());
    println!("Number of bisimilarity classes: {}", minimized.n_states());

    for class in 0..minimized.n_states() {
        let states: Vec<usize> = mapping.iter()
            .enumerate()
            .filter(|(_, c)| **c == class)
            .map(|(s, _)| s)
            .collect();
        println!("{class} (label {}): {states:?}", minimized.label(class));
        for (target, p) in minimized.successors(class) {
            println!("    -> {target}: {p}");
        }
    }
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::init();
    let args: Vec<_> = env::args_os().collect();
    if let [_, transitions, labels] = args.as_slice() {
        minimize(transitions, labels)
    } else {
        eprintln!("Invalid arguments. Usage: {} TRANSITIONS LABELS",
                  env::args().next().unwrap_or_default());
        std::process::exit(2);
    }
}
