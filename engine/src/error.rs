use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("node {node}: {message} at byte {position}")]
    Parse {
        node: String,
        position: usize,
        message: String,
    },
    #[error("duplicate node {0}")]
    DuplicateNode(String),
    #[error("node {node} references undeclared node {referenced}")]
    UndeclaredNode { node: String, referenced: String },
    #[error("node {node} is not monotone in {variable}")]
    NonMonotone { node: String, variable: String },
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("attractor is missing node {0}")]
    IncompleteAttractor(String),
    #[error("invalid value {value} for node {node}")]
    InvalidCoordinate { node: String, value: String },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("rate vector has length {actual}, expected {expected}")]
    RateLength { expected: usize, actual: usize },
    #[error("no attractor is reachable from the current configuration")]
    NoReachableAttractor,
    #[error("attractor list is empty")]
    NoAttractors,
    #[error("attractor {index} spans {actual} nodes, network has {expected}")]
    AttractorLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("attractors {first} and {second} overlap")]
    OverlappingAttractors { first: usize, second: usize },
    #[error("initial configuration has {actual} nodes, network has {expected}")]
    ConfigurationLength { expected: usize, actual: usize },
    #[error("{0} irreversible nodes in one transition space, at most 63 are supported")]
    TooManyIrreversible(usize),
    #[error("no transition can leave the current configuration")]
    Stuck,
    #[error("simulation interrupted")]
    Interrupted,
    #[error("number of simulations must be positive")]
    ZeroSimulations,
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
    #[error("worker {0} failed")]
    WorkerFailed(usize),
    #[error("worker {worker} reported {reported} of its {expected} runs")]
    MissingRuns {
        worker: usize,
        expected: usize,
        reported: u64,
    },
    #[error("no progress from workers within {0:?}")]
    Stalled(Duration),
}
