use std::env;
use std::ffi::OsString;
use std::io;
use std::time::Instant;

use probisim::*;
use probisim::distance::DistanceIteration;

const DEFAULT_ITERATIONS: usize = 10;
const DEFAULT_PRECISION: i32 = 6;

fn parse_arg<T: std::str::FromStr>(arg: Option<OsString>, default: T) -> io::Result<T> {
    match arg {
        None => Ok(default),
        Some(arg) => arg.to_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput,
                                          format!("Invalid numeric argument: {arg:?}"))),
    }
}

fn run(transitions: OsString, labels: OsString, mut rest: impl Iterator<Item=OsString>
) -> io::Result<()> {
    let iterations = parse_arg(rest.next(), DEFAULT_ITERATIONS)?;
    let precision = parse_arg(rest.next(), DEFAULT_PRECISION)?;
    let chain = LabelledMarkovChain::from_files(transitions, labels)?;
    println!("Number of states: {}", chain.n_states());

    let now = Instant::now();
    let bisimilarity = chain.bisimilarity(precision);
    println!("Bisimilarity decided in {:.5}s", now.elapsed().as_secs_f64());
    println!("Number of bisimilarity classes: {}", bisimilarity.count_classes());
    for class in bisimilarity.get_classes() {
        println!("{class:?}");
    }

    let now = Instant::now();
    let mut iteration = DistanceIteration::new(&chain, Tolerance::STANDARD)
        .skip_bisimilar(bisimilarity);
    let mut change = 0.0;
    for _ in 0..iterations {
        change = iteration.step();
    }
    println!("\nDistances after {iterations} iterations ({:.5}s, last change {change}):",
             now.elapsed().as_secs_f64());
    print!("{}", iteration.current());
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::init();
    let mut args = env::args_os();
    let program = args.next().unwrap_or_default();
    match (args.next(), args.next()) {
        (Some(transitions), Some(labels)) => run(transitions, labels, args),
        _ => {
            eprintln!("Invalid arguments. Usage: {program:?} TRANSITIONS LABELS [ITERATIONS] [PRECISION]");
            std::process::exit(2);
        },
    }
}
