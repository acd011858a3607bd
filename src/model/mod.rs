//! # Model - Parsed Network Definition
//!
//! A [`Model`] is the immutable result of parsing a `.bnd`/`.cfg` pair: an
//! ordered list of [`Node`]s (their position fixes their bit index in
//! [`crate::state::State`]), the constants and variables bound by the
//! configuration, and the initial-state distribution sampled at the start of
//! each trajectory.
//!
//! Node order is load-bearing: it is the only thing that ties a node name
//! to a bit index, so lookups (`node_index`, `get_attribute`) all key off the
//! `nodes` vector rather than a separately maintained index.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::expr::Expr;
use crate::state::State;

/// One Boolean network node: a name, its update logic, and its two
/// continuous-time rate expressions.
///
/// Immutable after parsing: nothing in this crate mutates a `Node` once a
/// `Model` is built.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub logic: Expr,
    pub rate_up: Expr,
    pub rate_down: Expr,
    pub internal: bool,
}

/// One entry of the initial-state distribution: a fully specified network
/// state and the probability mass assigned to it.
#[derive(Debug, Clone)]
pub struct InitialStateEntry {
    pub state: State,
    pub probability: f64,
}

/// The parsed, validated network and its configuration.
#[derive(Debug, Clone)]
pub struct Model {
    pub nodes: Vec<Node>,
    pub constants: HashMap<String, f64>,
    pub variables: HashMap<String, f64>,
    pub initial_distribution: Vec<InitialStateEntry>,
}

impl Model {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Resolves a `$name` alias on `current_node` to the referenced
    /// attribute's expression. The only recognized attribute names are
    /// `logic`, `rate_up`, and `rate_down`.
    pub fn get_attribute(&self, current_node: &str, attribute_name: &str) -> Option<&Expr> {
        let node = self.node(current_node)?;
        match attribute_name {
            "logic" => Some(&node.logic),
            "rate_up" => Some(&node.rate_up),
            "rate_down" => Some(&node.rate_down),
            _ => None,
        }
    }

    pub fn observable_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.internal).count()
    }

    /// A state-shaped bit vector with a 1 at every observable (non-internal)
    /// node's index, used to mask out internal nodes before recording
    /// final-state / fixed-state statistics.
    pub fn noninternals_mask(&self) -> State {
        let mut mask = State::empty(self.node_count());
        for (i, node) in self.nodes.iter().enumerate() {
            if !node.internal {
                mask.set(i);
            }
        }
        mask
    }

    /// Draws one entry from the initial-state distribution via linear
    /// cumulative search: `u` is a uniform value in `[0, 1)`.
    pub fn sample_initial(&self, u: f64) -> State {
        let mut cumulative = 0.0;
        for entry in &self.initial_distribution {
            cumulative += entry.probability;
            if u < cumulative {
                return entry.state;
            }
        }
        self.initial_distribution
            .last()
            .map(|e| e.state)
            .unwrap_or_else(|| State::empty(self.node_count().max(1)))
    }

    /// Enforces the two capacity limits this executable supports and the
    /// structural invariants needed before kernel compilation: at most 256
    /// nodes, at most 20 observable nodes, unique node names, and an
    /// initial-state distribution whose probabilities sum to 1 (within
    /// floating-point tolerance).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count() > crate::state::MAX_NODES {
            return Err(ConfigError::TooManyNodes(self.node_count()));
        }
        if self.observable_count() > 20 {
            return Err(ConfigError::TooManyObservables(self.observable_count()));
        }

        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(ConfigError::DuplicateNode(node.name.clone()));
            }
        }

        let total: f64 = self.initial_distribution.iter().map(|e| e.probability).sum();
        if !self.initial_distribution.is_empty() && (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::ProbabilitiesDoNotSum(total));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
