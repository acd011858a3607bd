//! Numeric evaluation of expressions against a constant/variable environment.
//!
//! Evaluation is only ever meant for closed-form rate/constant expressions.
//! Anything that mentions a node identifier, an alias, or a not-yet-flattened
//! chain cannot be evaluated outside code emission. That failure is reported
//! through [`EvalError`] rather than a panic: the only caller that evaluates
//! arbitrary user-supplied expressions, the `.cfg` constant/variable parser,
//! needs to turn it into a `ConfigError::Parse` on a malformed config file
//! rather than abort the process.

use super::{Expr, Op};
use std::collections::HashMap;

/// Constants and variables an expression may be evaluated against.
pub struct EvalContext<'a> {
    pub constants: &'a HashMap<String, f64>,
    pub variables: &'a HashMap<String, f64>,
}

/// Failure evaluating an expression: either a construct that code emission
/// handles instead of evaluation (a node, an alias, a flattened chain), or
/// an unrecognized operator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("cannot evaluate a node identifier ({0}) outside code emission")]
    Node(String),
    #[error("cannot evaluate an alias (${0}) outside code emission")]
    Alias(String),
    #[error("cannot evaluate a flat expression directly")]
    Flat,
    #[error("unknown operator in unary position")]
    UnknownUnaryOperator,
    #[error("unknown operator in binary position")]
    UnknownBinaryOperator,
    #[error("unknown variable or constant: {0}")]
    UnknownName(String),
}

impl Expr {
    /// Evaluates this expression to a float. See [`EvalError`] for the
    /// conditions under which this is a programming error rather than a
    /// recoverable failure.
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<f64, EvalError> {
        match self {
            Expr::Literal(v) => Ok(*v),
            Expr::Node(name) => Err(EvalError::Node(name.clone())),
            Expr::Alias(name) => Err(EvalError::Alias(name.clone())),
            Expr::Var(name) => lookup(ctx, name),
            Expr::Paren(e) => e.evaluate(ctx),
            Expr::Unary(op, e) => {
                let v = e.evaluate(ctx)?;
                match op {
                    Op::Plus => Ok(v),
                    Op::Minus => Ok(-v),
                    Op::Not => Ok(bool_to_f64(v == 0.0)),
                    _ => Err(EvalError::UnknownUnaryOperator),
                }
            }
            Expr::Binary(op, l, r) => {
                let a = l.evaluate(ctx)?;
                let b = r.evaluate(ctx)?;
                eval_binary(*op, a, b)
            }
            Expr::Ternary(cond, then_e, else_e) => {
                if cond.evaluate(ctx)? != 0.0 {
                    then_e.evaluate(ctx)
                } else {
                    else_e.evaluate(ctx)
                }
            }
            Expr::Flat(_, _) => Err(EvalError::Flat),
        }
    }
}

fn lookup(ctx: &EvalContext, name: &str) -> Result<f64, EvalError> {
    if let Some(v) = ctx.variables.get(name) {
        return Ok(*v);
    }
    if let Some(v) = ctx.constants.get(name) {
        return Ok(*v);
    }
    Err(EvalError::UnknownName(name.to_string()))
}

fn eval_binary(op: Op, a: f64, b: f64) -> Result<f64, EvalError> {
    match op {
        Op::Add => Ok(a + b),
        Op::Sub => Ok(a - b),
        Op::Mul => Ok(a * b),
        Op::Div => Ok(a / b),
        Op::And => Ok(bool_to_f64(a != 0.0 && b != 0.0)),
        Op::Or => Ok(bool_to_f64(a != 0.0 || b != 0.0)),
        Op::Eq => Ok(bool_to_f64(a == b)),
        Op::Ne => Ok(bool_to_f64(a != b)),
        Op::Le => Ok(bool_to_f64(a <= b)),
        Op::Lt => Ok(bool_to_f64(a < b)),
        Op::Ge => Ok(bool_to_f64(a >= b)),
        Op::Gt => Ok(bool_to_f64(a > b)),
        _ => Err(EvalError::UnknownBinaryOperator),
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}
