//! # State Module - Bit-Packed Boolean Network States
//!
//! This module provides the `State` type: a fixed-width bit vector representing
//! one assignment of 0/1 values to the nodes of a Boolean network. States are
//! stored as up to eight 32-bit words, which covers the crate's 256-node limit
//! (see the capacity check in [`crate::model::Model::validate`]) without any
//! heap allocation per sample, since the trajectory runner carries one
//! `State` per sample per recorded transition.
//!
//! ## Bit Layout
//!
//! Bit `i` lives in word `i / 32` at bit position `i % 32`. Words are ordered
//! little-endian within the vector: word 0 holds nodes 0-31, word 1 holds
//! nodes 32-63, and so on. Comparisons (`Ord`, used for deterministic
//! final-state histogram ordering) walk the word array from the highest
//! index downward, matching the convention in the reference simulator this
//! crate is derived from.

use std::fmt;

/// Maximum number of 32-bit words a state can span (8 × 32 = 256 nodes).
pub const MAX_WORDS: usize = 8;

/// Maximum number of Boolean nodes a model may declare.
pub const MAX_NODES: usize = MAX_WORDS * 32;

/// A bit-packed Boolean assignment over up to [`MAX_NODES`] nodes.
///
/// Only the lowest `word_count` words are meaningful; bits at or beyond the
/// state's declared width are always zero (enforced by every mutator here).
#[derive(Clone, Copy, Eq, serde::Serialize, serde::Deserialize)]
pub struct State {
    words: [u32; MAX_WORDS],
    word_count: u8,
}

impl State {
    /// Creates the all-zero state for a network with `node_count` nodes.
    ///
    /// # Panics
    ///
    /// Panics if `node_count` is 0 or exceeds [`MAX_NODES`].
    pub fn empty(node_count: usize) -> Self {
        assert!(node_count >= 1 && node_count <= MAX_NODES, "node_count out of range: {node_count}");
        State {
            words: [0; MAX_WORDS],
            word_count: Self::words_for(node_count) as u8,
        }
    }

    /// Number of 32-bit words this state's width requires.
    pub const fn words_for(node_count: usize) -> usize {
        (node_count + 31) / 32
    }

    /// Number of words backing this state (`⌈N/32⌉`).
    pub fn word_count(&self) -> usize {
        self.word_count as usize
    }

    /// Read-only view of the backing words, truncated to `word_count`.
    pub fn words(&self) -> &[u32] {
        &self.words[..self.word_count()]
    }

    /// Returns whether bit `i` is set.
    pub fn is_set(&self, i: usize) -> bool {
        let (word, bit) = Self::locate(i);
        self.words[word] & (1u32 << bit) != 0
    }

    /// Sets bit `i` to 1.
    pub fn set(&mut self, i: usize) {
        let (word, bit) = Self::locate(i);
        self.words[word] |= 1u32 << bit;
    }

    /// Sets bit `i` to 0.
    pub fn unset(&mut self, i: usize) {
        let (word, bit) = Self::locate(i);
        self.words[word] &= !(1u32 << bit);
    }

    /// Sets bit `i` to `value`.
    pub fn set_to(&mut self, i: usize, value: bool) {
        if value { self.set(i) } else { self.unset(i) }
    }

    /// Flips bit `i`.
    pub fn flip(&mut self, i: usize) {
        let (word, bit) = Self::locate(i);
        self.words[word] ^= 1u32 << bit;
    }

    /// Bitwise AND against `other`, keeping this state's width.
    pub fn and(&self, other: &State) -> State {
        let mut out = *self;
        for (w, o) in out.words.iter_mut().zip(other.words.iter()) {
            *w &= o;
        }
        out
    }

    /// Renders the state the way the reference simulator's report does:
    /// active node names joined with `" -- "`, or `"<nil>"` if none are set.
    pub fn display_with_names(&self, names: &[String]) -> String {
        let mut parts = Vec::new();
        for (i, name) in names.iter().enumerate() {
            if self.is_set(i) {
                parts.push(name.as_str());
            }
        }
        if parts.is_empty() {
            "<nil>".to_string()
        } else {
            parts.join(" -- ")
        }
    }

    fn locate(i: usize) -> (usize, u32) {
        (i / 32, (i % 32) as u32)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.words() == other.words()
    }
}

impl std::hash::Hash for State {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.words().hash(state);
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        for i in (0..self.word_count().max(other.word_count())).rev() {
            let a = self.words.get(i).copied().unwrap_or(0);
            let b = other.words.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                std::cmp::Ordering::Equal => continue,
                ord => return ord,
            }
        }
        std::cmp::Ordering::Equal
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State(")?;
        for w in self.words().iter().rev() {
            write!(f, "{:032b}", w)?;
        }
        write!(f, ")")
    }
}
