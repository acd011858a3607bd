//! Renders a simplified [`Expr`] as kernel source text.
//!
//! This is the textual counterpart to the in-memory interpretation the
//! trajectory runner actually uses at simulation time: it exists so the
//! bitmask specialization below can be inspected and tested independently of
//! the runner, and so a compiled [`crate::kernel::Kernel`] can expose its
//! generated logic/rate expressions for diagnostics.
//!
//! The one piece of real specialization is flat AND/OR chains whose operands
//! are all bare node identifiers or their negation: instead of emitting N
//! individual bit tests joined by `&&`/`||`, the chain is grouped by state
//! word into a pair of masks and emitted as one masked comparison per word.
//! A node that appears both positive and negated is a contradiction and
//! collapses the whole chain to a constant.

use super::{Expr, Op};
use crate::model::Model;

/// Failure rendering an expression to source text.
///
/// Unlike [`super::eval::EvalError`], these are genuine configuration
/// problems, such as a `.bnd` file referencing a node or attribute that does
/// not exist, surfaced to the caller as a `CompileError` rather than
/// panicking.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodegenError {
    #[error("unknown node name: {0}")]
    UnknownNode(String),
    #[error("unknown attribute ${0} on node {1}")]
    UnknownAttribute(String, String),
    #[error("unknown operator in unary position")]
    UnknownUnaryOperator,
    #[error("unknown operator in binary position")]
    UnknownBinaryOperator,
}

impl Expr {
    /// Emits this expression as a single C-like boolean/arithmetic
    /// expression over a `state: &[u32]` word array, resolving node names
    /// and `$alias` references against `model`. `current_node` is the node
    /// whose attribute table aliases resolve against.
    pub fn emit(&self, model: &Model, current_node: &str) -> Result<String, CodegenError> {
        let mut out = String::new();
        self.emit_into(model, current_node, &mut out)?;
        Ok(out)
    }

    fn emit_into(
        &self,
        model: &Model,
        current_node: &str,
        out: &mut String,
    ) -> Result<(), CodegenError> {
        match self {
            Expr::Literal(v) => {
                out.push_str(&format_literal(*v));
                Ok(())
            }
            Expr::Node(name) => emit_identifier(model, name, out),
            Expr::Var(name) => {
                let v = model.variables.get(name).copied().unwrap_or(0.0);
                out.push_str(&format_literal(v));
                Ok(())
            }
            Expr::Alias(name) => {
                let attr_expr = model
                    .get_attribute(current_node, name)
                    .ok_or_else(|| CodegenError::UnknownAttribute(name.clone(), current_node.to_string()))?;
                attr_expr.emit_into(model, current_node, out)
            }
            Expr::Paren(e) => {
                out.push('(');
                e.emit_into(model, current_node, out)?;
                out.push(')');
                Ok(())
            }
            Expr::Unary(op, e) => {
                out.push_str(match op {
                    Op::Plus => "+",
                    Op::Minus => "-",
                    Op::Not => "!",
                    _ => return Err(CodegenError::UnknownUnaryOperator),
                });
                e.emit_into(model, current_node, out)
            }
            Expr::Binary(op, l, r) => {
                l.emit_into(model, current_node, out)?;
                out.push_str(binop_str(*op)?);
                r.emit_into(model, current_node, out)
            }
            Expr::Ternary(cond, then_e, else_e) => {
                cond.emit_into(model, current_node, out)?;
                out.push_str(" ? ");
                then_e.emit_into(model, current_node, out)?;
                out.push_str(" : ");
                else_e.emit_into(model, current_node, out)
            }
            Expr::Flat(op, exprs) => emit_flat(*op, exprs, model, current_node, out),
        }
    }
}

fn binop_str(op: Op) -> Result<&'static str, CodegenError> {
    Ok(match op {
        Op::Add => " + ",
        Op::Sub => " - ",
        Op::Mul => " * ",
        Op::Div => " / ",
        Op::And => " && ",
        Op::Or => " || ",
        Op::Eq => " == ",
        Op::Ne => " != ",
        Op::Le => " <= ",
        Op::Lt => " < ",
        Op::Ge => " >= ",
        Op::Gt => " > ",
        _ => return Err(CodegenError::UnknownBinaryOperator),
    })
}

fn emit_identifier(model: &Model, name: &str, out: &mut String) -> Result<(), CodegenError> {
    let idx = model
        .node_index(name)
        .ok_or_else(|| CodegenError::UnknownNode(name.to_string()))?;
    out.push_str(&format!(
        "(state[{}] & {}u) != 0",
        idx / 32,
        1u32 << (idx % 32)
    ));
    Ok(())
}

fn format_literal(v: f64) -> String {
    format!("{v}")
}

fn emit_flat(
    op: Op,
    exprs: &[Expr],
    model: &Model,
    current_node: &str,
    out: &mut String,
) -> Result<(), CodegenError> {
    if op != Op::And && op != Op::Or {
        return emit_flat_default(op, exprs, model, current_node, out);
    }

    match collect_bitmask_operands(exprs, model)? {
        Some((mut positive, mut negative)) => {
            positive.sort_unstable();
            negative.sort_unstable();
            emit_bitmask_chain(op, &positive, &negative, out);
            Ok(())
        }
        None => emit_flat_default(op, exprs, model, current_node, out),
    }
}

/// Recognizes a flat AND/OR chain that is entirely bare node identifiers and
/// their negations, returning the sorted indices split into positive and
/// negated groups. Returns `None` when any operand is anything else, in
/// which case the chain falls back to the generic joiner.
fn collect_bitmask_operands(
    exprs: &[Expr],
    model: &Model,
) -> Result<Option<(Vec<usize>, Vec<usize>)>, CodegenError> {
    let mut positive = Vec::new();
    let mut negative = Vec::new();

    for e in exprs {
        match e {
            Expr::Node(name) => match model.node_index(name) {
                Some(idx) => positive.push(idx),
                None => return Err(CodegenError::UnknownNode(name.clone())),
            },
            Expr::Unary(Op::Not, inner) => match inner.as_ref() {
                Expr::Node(name) => match model.node_index(name) {
                    Some(idx) => negative.push(idx),
                    None => return Err(CodegenError::UnknownNode(name.clone())),
                },
                _ => return Ok(None),
            },
            _ => return Ok(None),
        }
    }

    Ok(Some((positive, negative)))
}

/// Builds and appends the word-grouped masked comparison for a bitmask-
/// suitable flat AND/OR chain.
///
/// For each word `w` touched by any operand, `and_mask` has a bit set for
/// every node (positive or negated) tested in that word, and `xor_mask` has
/// a bit set for every negated node. AND membership is then
/// `(state[w] & and_mask) ^ (and_mask ^ xor_mask) == 0`; OR membership is
/// `(state[w] ^ xor_mask) & and_mask != 0`. The XOR is parenthesized
/// explicitly in both forms rather than relying on `&`/`^` precedence.
fn emit_bitmask_chain(op: Op, positive: &[usize], negative: &[usize], out: &mut String) {
    let contradiction = positive.iter().any(|p| negative.binary_search(p).is_ok());
    if contradiction {
        out.push_str(if op == Op::And { "false" } else { "true" });
        return;
    }

    let max_index = positive
        .iter()
        .chain(negative.iter())
        .copied()
        .max()
        .unwrap_or(0);
    let word_count = max_index / 32 + 1;

    out.push('(');
    let mut first = true;
    for w in 0..word_count {
        let lo = w * 32;
        let hi = lo + 32;
        let mut and_mask: u32 = 0;
        let mut xor_mask: u32 = 0;
        for &p in positive.iter().filter(|&&p| p >= lo && p < hi) {
            and_mask |= 1u32 << (p % 32);
        }
        for &n in negative.iter().filter(|&&n| n >= lo && n < hi) {
            and_mask |= 1u32 << (n % 32);
            xor_mask |= 1u32 << (n % 32);
        }
        if and_mask == 0 {
            continue;
        }
        if !first {
            out.push_str(" | ");
        }
        first = false;
        if op == Op::And {
            out.push_str(&format!(
                "((state[{w}] & {and_mask}u) ^ ({and_mask}u ^ {xor_mask}u))"
            ));
        } else {
            out.push_str(&format!("((state[{w}] ^ {xor_mask}u) & {and_mask}u)"));
        }
    }
    if first {
        out.push('0');
    }
    out.push(')');
    out.push_str(if op == Op::And { " == 0" } else { " != 0" });
}

fn emit_flat_default(
    op: Op,
    exprs: &[Expr],
    model: &Model,
    current_node: &str,
    out: &mut String,
) -> Result<(), CodegenError> {
    let sep = binop_str(op)?;
    out.push('(');
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        e.emit_into(model, current_node, out)?;
    }
    out.push(')');
    Ok(())
}
