//! Algebraic simplification: a canonicalizing rewrite that turns a freshly
//! parsed tree into a flatter, more uniform one before the kernel generator
//! lowers it. Associative chains of the same operator collapse into a
//! single [`super::Expr::Flat`], and redundant unary/parenthesis wrapping
//! disappears.
//!
//! Simplification is not defined on an already-flat expression: flat nodes
//! only ever arise as simplification *output*, never as input, so seeing one
//! here means a caller handed back an already-simplified tree by mistake.

use super::{Expr, Op};

impl Expr {
    /// Rewrites this expression into canonical form. See the module docs for
    /// what "canonical" means here, and why a [`Expr::Flat`] input panics.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Literal(v) => Expr::Literal(*v),
            Expr::Node(n) => Expr::Node(n.clone()),
            Expr::Var(n) => Expr::Var(n.clone()),
            Expr::Alias(n) => Expr::Alias(n.clone()),
            Expr::Unary(op, e) => simplify_unary(*op, e),
            Expr::Binary(op, l, r) => simplify_binary(*op, l, r),
            Expr::Ternary(c, t, e) => simplify_ternary(c, t, e),
            Expr::Paren(e) => simplify_paren(e),
            Expr::Flat(..) => panic!("simplify is not defined on an already-flat expression"),
        }
    }
}

fn simplify_unary(op: Op, e: &Expr) -> Expr {
    let simplified = e.simplify();

    if op == Op::Plus {
        return simplified;
    }

    if let Expr::Unary(inner_op, inner) = &simplified {
        if *inner_op == op {
            return (**inner).clone();
        }
    }

    Expr::Unary(op, Box::new(simplified))
}

fn simplify_ternary(cond: &Expr, then_branch: &Expr, else_branch: &Expr) -> Expr {
    let cond = cond.simplify();
    let then_branch = then_branch.simplify();
    let else_branch = else_branch.simplify();

    if let Expr::Literal(v) = cond {
        return if v != 0.0 { then_branch } else { else_branch };
    }

    Expr::Ternary(Box::new(cond), Box::new(then_branch), Box::new(else_branch))
}

fn simplify_paren(e: &Expr) -> Expr {
    let simplified = e.simplify();
    match simplified {
        Expr::Literal(_)
        | Expr::Node(_)
        | Expr::Var(_)
        | Expr::Alias(_)
        | Expr::Paren(_)
        | Expr::Unary(..) => simplified,
        other => Expr::Paren(Box::new(other)),
    }
}

/// Drops a `(binary/flat)` wrapper when its operator matches the enclosing
/// binary's operator, so chains like `(a & b) & c` flatten the same way
/// `a & b & c` does.
fn strip_paren_same_op(e: Expr, op: Op) -> Expr {
    match e {
        Expr::Paren(inner) => {
            let strip = matches!(inner.as_ref(), Expr::Binary(iop, _, _) if *iop == op)
                || matches!(inner.as_ref(), Expr::Flat(iop, _) if *iop == op);
            if strip { *inner } else { Expr::Paren(inner) }
        }
        other => other,
    }
}

fn simplify_binary(op: Op, l: &Expr, r: &Expr) -> Expr {
    let sl = strip_paren_same_op(l.simplify(), op);
    let sr = strip_paren_same_op(r.simplify(), op);

    let left_is_flat = matches!(&sl, Expr::Flat(lop, _) if *lop == op);
    let right_is_flat = matches!(&sr, Expr::Flat(rop, _) if *rop == op);

    if left_is_flat && right_is_flat {
        if let (Expr::Flat(_, mut lexprs), Expr::Flat(_, mut rexprs)) = (sl, sr) {
            lexprs.append(&mut rexprs);
            return Expr::Flat(op, lexprs);
        }
        unreachable!()
    } else if left_is_flat {
        if let Expr::Flat(_, mut lexprs) = sl {
            lexprs.push(sr);
            return Expr::Flat(op, lexprs);
        }
        unreachable!()
    } else if right_is_flat {
        if let Expr::Flat(_, mut rexprs) = sr {
            rexprs.insert(0, sl);
            return Expr::Flat(op, rexprs);
        }
        unreachable!()
    }

    Expr::Flat(op, vec![sl, sr])
}
