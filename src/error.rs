use std::{fmt, io, num, error, result};

/// A chain description that does not form a labelled Markov chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    NotSquare { rows: usize, columns: usize },
    LabelCount { states: usize, labels: usize },
    StateOutOfRange { state: usize, states: usize },
    NegativeProbability { source: usize, target: usize },
    NotStochastic { state: usize, sum: f64 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotSquare { rows, columns } => {
                write!(f, "transition matrix is not square: {rows} rows, {columns} columns")
            },
            Error::LabelCount { states, labels } => {
                write!(f, "expected {states} labels, got {labels}")
            },
            Error::StateOutOfRange { state, states } => {
                write!(f, "state {state} is out of range for a chain with {states} states")
            },
            Error::NegativeProbability { source, target } => {
                write!(f, "negative transition probability from {source} to {target}")
            },
            Error::NotStochastic { state, sum } => {
                write!(f, "outgoing probabilities of state {state} sum to {sum}, not 1")
            },
        }
    }
}

impl error::Error for Error {}

/// Type alias for `Result<T, probisim::Error>`
pub type Result<T> = result::Result<T, Error>;


#[derive(Debug)]
pub enum ParseError {
    IOError(io::Error),
    MissingField,
    ParseIntError(num::ParseIntError),
    ParseFloatError(num::ParseFloatError),
    InvalidChain(Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::IOError(source) => source.fmt(f),
            ParseError::ParseIntError(source) => source.fmt(f),
            ParseError::ParseFloatError(source) => source.fmt(f),
            ParseError::InvalidChain(source) => source.fmt(f),
            ParseError::MissingField => write!(f, "input ended before all values were read"),
        }
    }
}

impl error::Error for ParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ParseError::IOError(source) => Some(source),
            ParseError::ParseIntError(source) => Some(source),
            ParseError::ParseFloatError(source) => Some(source),
            ParseError::InvalidChain(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::IOError(e)
    }
}

impl From<num::ParseIntError> for ParseError {
    fn from(e: num::ParseIntError) -> Self {
        ParseError::ParseIntError(e)
    }
}

impl From<num::ParseFloatError> for ParseError {
    fn from(e: num::ParseFloatError) -> Self {
        ParseError::ParseFloatError(e)
    }
}

impl From<Error> for ParseError {
    fn from(e: Error) -> Self {
        ParseError::InvalidChain(e)
    }
}

impl From<ParseError> for io::Error {
    fn from(e: ParseError) -> io::Error {
        match e {
            ParseError::IOError(source) => source,
            _ => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
