//! Top-level error type threading the four kinds this crate distinguishes:
//! configuration, kernel compilation, simulation runtime, and I/O. Each
//! surfaces to a different point in the CLI (see `main.rs`), so they stay
//! separate variants rather than one flat string.

use thiserror::Error;

use crate::kernel::CompileError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse-time or capacity violations, caught before any kernel compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("network has {0} nodes, maximum is 256")]
    TooManyNodes(usize),
    #[error("network has {0} observable (non-internal) nodes, maximum is 20")]
    TooManyObservables(usize),
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),
    #[error("unknown node referenced: {0}")]
    UnknownNode(String),
    #[error("initial-state distribution probabilities sum to {0}, expected 1.0")]
    ProbabilitiesDoNotSum(f64),
    #[error("missing required constant: {0}")]
    MissingConstant(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// A fatal condition raised by a running simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("node {node} produced a non-finite rate ({value})")]
    NonFiniteRate { node: String, value: f64 },
    #[error("rng exhausted while sampling transitions")]
    RngExhausted,
    #[error("out of memory allocating trajectory buffers")]
    OutOfMemory,
}
