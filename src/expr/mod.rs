//! # Expression Tree Module - Node Logic and Rate Formulas
//!
//! Every node in a Boolean network carries three formulas: a logical update
//! rule and two rate expressions (up-rate, down-rate). All three are the same
//! kind of tree, [`Expr`], which supports exactly three operations, each in
//! its own submodule:
//!
//! - [`eval`]: numeric evaluation against constants/variables, used when a
//!   rate expression is a closed-form arithmetic formula.
//! - [`simplify`]: a canonicalizing rewrite that flattens associative chains
//!   and removes redundant unary/parenthesis wrapping so the kernel
//!   generator sees a normalized tree.
//! - [`codegen`]: renders a simplified expression as kernel source text,
//!   including the bitmask specialization for AND/OR chains over node
//!   identifiers.
//!
//! Dispatch is a plain `match` on the `Expr` variant in each of the three
//! modules rather than a trait-object hierarchy, since there is no cyclic
//! reference between expressions and the model they are evaluated against
//! (expressions name nodes/aliases by string, resolved against an immutable
//! [`crate::model::Model`] only at evaluation/emission time).

pub mod codegen;
pub mod eval;
pub mod simplify;

/// Operators shared by unary, binary, and flat expressions.
///
/// Not every operator is legal in every position: unary expressions only
/// ever carry [`Op::Plus`], [`Op::Minus`], or [`Op::Not`]; binary and flat
/// expressions carry the rest. Keeping one enum (rather than splitting
/// unary/binary operator types) mirrors the reference grammar this crate is
/// derived from and keeps `simplify`'s "same operator" checks a single
/// equality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Plus,
    Minus,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
}

/// The expression AST.
///
/// `Flat` is never produced by a parser: it only ever arises as the output
/// of [`simplify`], representing a chain of the same associative operator
/// applied to N operands. Evaluating a `Node`/`Alias`/`Flat` via
/// [`eval::Expr::evaluate`] reports `Err` rather than panicking, since the
/// one caller that evaluates
/// user-supplied expressions (parsing `.cfg` constants/variables) needs to
/// turn that failure into a configuration error, not abort the process.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric constant baked into the tree at parse time.
    Literal(f64),
    /// A reference to a Boolean network node by name (its bit in the state).
    Node(String),
    /// A reference to a configuration variable by name.
    Var(String),
    /// A `$name` reference to another attribute of the current node,
    /// resolved against the model only during code emission.
    Alias(String),
    Unary(Op, Box<Expr>),
    Binary(Op, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Paren(Box<Expr>),
    /// A flattened associative chain; only ever produced by [`simplify`].
    Flat(Op, Vec<Expr>),
}

impl Expr {
    pub fn literal(v: f64) -> Expr {
        Expr::Literal(v)
    }

    pub fn node(name: impl Into<String>) -> Expr {
        Expr::Node(name.into())
    }

    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(name.into())
    }

    pub fn alias(name: impl Into<String>) -> Expr {
        Expr::Alias(name.into())
    }

    pub fn unary(op: Op, e: Expr) -> Expr {
        Expr::Unary(op, Box::new(e))
    }

    pub fn binary(op: Op, l: Expr, r: Expr) -> Expr {
        Expr::Binary(op, Box::new(l), Box::new(r))
    }

    pub fn paren(e: Expr) -> Expr {
        Expr::Paren(Box::new(e))
    }
}
