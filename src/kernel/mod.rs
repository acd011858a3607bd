//! # Kernel generator - Lowering a Model into a Simulation Kernel
//!
//! [`Kernel::compile`] simplifies every node's logic/rate expression and
//! checks that each one lowers to valid kernel source (catching unknown node
//! or attribute references before any sample is simulated). The textual
//! lowering is kept and exposed via [`Kernel::emit_kernel_source`] purely for
//! inspection and for testing the bitmask specialization in
//! [`crate::expr::codegen`]. The `simulate` entry point below interprets the
//! simplified tree directly instead of compiling and running that text.
//!
//! `init_random`, `init_state`, and `simulate` are this kernel's three
//! generated entry points, matching the external-interface table: seed an
//! RNG per sample, sample an initial state per sample, then advance every
//! alive sample by up to `batch_len_limit` transitions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use rayon::prelude::*;

use crate::error::RuntimeError;
use crate::expr::codegen::CodegenError;
use crate::expr::{Expr, Op};
use crate::model::Model;
use crate::runner::{Trajectory, Transition};
use crate::state::State;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("kernel synthesis failed for node {node}'s {attribute} expression: {source}")]
    Codegen {
        node: String,
        attribute: &'static str,
        #[source]
        source: CodegenError,
    },
    #[error("network has no nodes")]
    Empty,
}

#[derive(Debug, Clone)]
struct CompiledNode {
    name: String,
    logic: Expr,
    rate_up: Expr,
    rate_down: Expr,
}

#[derive(Debug, Clone)]
pub struct Kernel {
    model: Model,
    nodes: Vec<CompiledNode>,
    word_count: usize,
    discrete_time: bool,
    max_time: f64,
}

impl Kernel {
    pub fn compile(model: &Model, discrete_time: bool) -> Result<Kernel, CompileError> {
        if model.nodes.is_empty() {
            return Err(CompileError::Empty);
        }

        let mut nodes = Vec::with_capacity(model.node_count());
        for node in &model.nodes {
            let logic = node.logic.simplify();
            let rate_up = node.rate_up.simplify();
            let rate_down = node.rate_down.simplify();

            logic
                .emit(model, &node.name)
                .map_err(|source| CompileError::Codegen { node: node.name.clone(), attribute: "logic", source })?;
            rate_up
                .emit(model, &node.name)
                .map_err(|source| CompileError::Codegen { node: node.name.clone(), attribute: "rate_up", source })?;
            rate_down
                .emit(model, &node.name)
                .map_err(|source| CompileError::Codegen { node: node.name.clone(), attribute: "rate_down", source })?;

            nodes.push(CompiledNode { name: node.name.clone(), logic, rate_up, rate_down });
        }

        let max_time = model.constants.get("max_time").copied().unwrap_or(0.0);

        Ok(Kernel {
            model: model.clone(),
            nodes,
            word_count: State::words_for(model.node_count()),
            discrete_time,
            max_time,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn discrete_time(&self) -> bool {
        self.discrete_time
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Renders every node's compiled logic/rate_up/rate_down expression as
    /// kernel source text, in model order.
    pub fn emit_kernel_source(&self) -> Result<String, CodegenError> {
        let mut out = String::new();
        for node in &self.nodes {
            out.push_str(&format!("// {}\n", node.name));
            out.push_str("logic: ");
            out.push_str(&node.logic.emit(&self.model, &node.name)?);
            out.push('\n');
            out.push_str("rate_up: ");
            out.push_str(&node.rate_up.emit(&self.model, &node.name)?);
            out.push('\n');
            out.push_str("rate_down: ");
            out.push_str(&node.rate_down.emit(&self.model, &node.name)?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn init_random(&self, seeds: &[u64]) -> Vec<StdRng> {
        seeds.iter().map(|&seed| StdRng::seed_from_u64(seed)).collect()
    }

    pub fn init_state(&self, rngs: &mut [StdRng]) -> Vec<State> {
        rngs.iter_mut()
            .map(|rng| self.model.sample_initial(rng.random::<f64>()))
            .collect()
    }

    /// Advances each alive sample by up to `batch_len_limit` transitions, or
    /// until it is absorbed (`R = 0`) or reaches `max_time`. Samples already
    /// marked not-alive are left untouched.
    pub fn simulate(
        &self,
        rngs: &mut [StdRng],
        states: &mut [State],
        times: &mut [f64],
        alive: &mut [bool],
        trajectories: &mut [Trajectory],
        batch_len_limit: usize,
    ) -> Result<(), RuntimeError> {
        states
            .par_iter_mut()
            .zip(times.par_iter_mut())
            .zip(alive.par_iter_mut())
            .zip(rngs.par_iter_mut())
            .zip(trajectories.par_iter_mut())
            .try_for_each(|((((state, t), is_alive), rng), traj)| {
                if !*is_alive {
                    return Ok(());
                }
                self.step_one(state, t, is_alive, rng, traj, batch_len_limit)
            })
    }

    fn step_one(
        &self,
        state: &mut State,
        t: &mut f64,
        is_alive: &mut bool,
        rng: &mut StdRng,
        traj: &mut Trajectory,
        batch_len_limit: usize,
    ) -> Result<(), RuntimeError> {
        for _ in 0..batch_len_limit {
            if *t >= self.max_time {
                *is_alive = false;
                traj.terminated = true;
                traj.final_state = Some(*state);
                return Ok(());
            }

            let mut rates = Vec::with_capacity(self.nodes.len());
            let mut total = 0.0_f64;
            for node in &self.nodes {
                let idx = self
                    .model
                    .node_index(&node.name)
                    .expect("node indices are validated at compile time");
                let wants = interpret(&node.logic, &self.model, &node.name, state) != 0.0;
                let bit_set = state.is_set(idx);
                let rate = if wants == bit_set {
                    0.0
                } else if wants {
                    interpret(&node.rate_up, &self.model, &node.name, state)
                } else {
                    interpret(&node.rate_down, &self.model, &node.name, state)
                };
                if !rate.is_finite() || rate < 0.0 {
                    return Err(RuntimeError::NonFiniteRate { node: node.name.clone(), value: rate });
                }
                rates.push(rate);
                total += rate;
            }

            if total == 0.0 {
                *is_alive = false;
                traj.terminated = true;
                traj.final_state = Some(*state);
                return Ok(());
            }

            let (flip_index, dt) = if self.discrete_time {
                let candidates: Vec<usize> =
                    rates.iter().enumerate().filter(|(_, &r)| r > 0.0).map(|(i, _)| i).collect();
                let idx = candidates[rng.random_range(0..candidates.len())];
                (idx, 1.0)
            } else {
                let exp = Exp::new(total).expect("total rate is positive and finite here");
                let tau = exp.sample(rng);
                let mut target = rng.random::<f64>() * total;
                let mut idx = rates.len() - 1;
                for (i, &r) in rates.iter().enumerate() {
                    if target < r {
                        idx = i;
                        break;
                    }
                    target -= r;
                }
                (idx, tau)
            };

            let entry = *t;
            *t += dt;
            traj.transitions.push(Transition { state: *state, entry_time: entry, exit_time: *t });
            state.flip(flip_index);
        }
        Ok(())
    }
}

/// Interprets a simplified expression tree against a live state, resolving
/// node bits, variables, and aliases as it goes. This is the kernel's own
/// execution mechanism and handles every variant, unlike
/// [`crate::expr::eval::evaluate`], which is only ever used for closed-form
/// rate constants and errors on a node, alias, or flat chain.
fn interpret(expr: &Expr, model: &Model, current_node: &str, state: &State) -> f64 {
    match expr {
        Expr::Literal(v) => *v,
        Expr::Node(name) => {
            let idx = model.node_index(name).expect("unknown node name validated at compile time");
            if state.is_set(idx) { 1.0 } else { 0.0 }
        }
        Expr::Var(name) => model.variables.get(name).copied().unwrap_or(0.0),
        Expr::Alias(name) => {
            let attr = model
                .get_attribute(current_node, name)
                .expect("unknown attribute validated at compile time");
            interpret(attr, model, current_node, state)
        }
        Expr::Paren(e) => interpret(e, model, current_node, state),
        Expr::Unary(op, e) => {
            let v = interpret(e, model, current_node, state);
            match op {
                Op::Plus => v,
                Op::Minus => -v,
                Op::Not => bool_to_f64(v == 0.0),
                _ => unreachable!("unary position only ever carries Plus/Minus/Not"),
            }
        }
        Expr::Binary(op, l, r) => {
            let a = interpret(l, model, current_node, state);
            let b = interpret(r, model, current_node, state);
            apply_binary(*op, a, b)
        }
        Expr::Ternary(cond, then_e, else_e) => {
            if interpret(cond, model, current_node, state) != 0.0 {
                interpret(then_e, model, current_node, state)
            } else {
                interpret(else_e, model, current_node, state)
            }
        }
        Expr::Flat(op, exprs) => {
            let mut values = exprs.iter().map(|e| interpret(e, model, current_node, state));
            let first = values.next().expect("a flat expression always has at least two operands");
            values.fold(first, |acc, v| apply_binary(*op, acc, v))
        }
    }
}

fn apply_binary(op: Op, a: f64, b: f64) -> f64 {
    match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::And => bool_to_f64(a != 0.0 && b != 0.0),
        Op::Or => bool_to_f64(a != 0.0 || b != 0.0),
        Op::Eq => bool_to_f64(a == b),
        Op::Ne => bool_to_f64(a != b),
        Op::Le => bool_to_f64(a <= b),
        Op::Lt => bool_to_f64(a < b),
        Op::Ge => bool_to_f64(a >= b),
        Op::Gt => bool_to_f64(a > b),
        _ => unreachable!("binary position never carries a unary-only operator"),
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests;
