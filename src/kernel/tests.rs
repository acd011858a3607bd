use super::*;
use crate::expr::Expr;
use crate::model::{InitialStateEntry, Node};
use std::collections::HashMap;

fn single_node_model(max_time: f64) -> Model {
    let mut constants = HashMap::new();
    constants.insert("max_time".to_string(), max_time);

    Model {
        nodes: vec![Node {
            name: "A".to_string(),
            logic: Expr::literal(1.0),
            rate_up: Expr::literal(1.0),
            rate_down: Expr::literal(0.0),
            internal: false,
        }],
        constants,
        variables: HashMap::new(),
        initial_distribution: vec![InitialStateEntry { state: State::empty(1), probability: 1.0 }],
    }
}

#[test]
fn compile_rejects_empty_model() {
    let model = Model {
        nodes: vec![],
        constants: HashMap::new(),
        variables: HashMap::new(),
        initial_distribution: vec![],
    };
    assert!(matches!(Kernel::compile(&model, false), Err(CompileError::Empty)));
}

#[test]
fn compile_rejects_unknown_node_reference() {
    let mut model = single_node_model(10.0);
    model.nodes[0].logic = Expr::node("ghost");
    let err = Kernel::compile(&model, false).unwrap_err();
    assert!(matches!(err, CompileError::Codegen { attribute: "logic", .. }));
}

#[test]
fn emit_kernel_source_lists_every_node() {
    let model = single_node_model(10.0);
    let kernel = Kernel::compile(&model, false).unwrap();
    let source = kernel.emit_kernel_source().unwrap();
    assert!(source.contains("// A"));
    assert!(source.contains("logic:"));
    assert!(source.contains("rate_up:"));
    assert!(source.contains("rate_down:"));
}

#[test]
fn simulate_flips_then_absorbs_on_constant_logic() {
    // A single node whose logic always wants it set: one up-flip, then
    // absorbed once the bit matches the logic.
    let model = single_node_model(1000.0);
    let kernel = Kernel::compile(&model, false).unwrap();

    let mut rngs = kernel.init_random(&[42]);
    let mut states = kernel.init_state(&mut rngs);
    let mut times = vec![0.0];
    let mut alive = vec![true];
    let mut trajectories = vec![Trajectory::default()];

    kernel
        .simulate(&mut rngs, &mut states, &mut times, &mut alive, &mut trajectories, 10)
        .unwrap();

    assert!(!alive[0]);
    assert!(trajectories[0].terminated);
    assert_eq!(trajectories[0].transitions.len(), 1);
    let transition = &trajectories[0].transitions[0];
    assert_eq!(transition.entry_time, 0.0);
    assert!(transition.exit_time > transition.entry_time);
    assert!(states[0].is_set(0));
}

#[test]
fn simulate_respects_max_time_timeout() {
    let model = single_node_model(0.0);
    let kernel = Kernel::compile(&model, false).unwrap();

    let mut rngs = kernel.init_random(&[7]);
    let mut states = kernel.init_state(&mut rngs);
    let mut times = vec![0.0];
    let mut alive = vec![true];
    let mut trajectories = vec![Trajectory::default()];

    kernel
        .simulate(&mut rngs, &mut states, &mut times, &mut alive, &mut trajectories, 10)
        .unwrap();

    assert!(!alive[0]);
    assert!(trajectories[0].transitions.is_empty());
    assert!(!states[0].is_set(0));
}

#[test]
fn simulate_is_deterministic_given_seed() {
    let model = single_node_model(1000.0);
    let kernel = Kernel::compile(&model, false).unwrap();

    let run = || {
        let mut rngs = kernel.init_random(&[123]);
        let mut states = kernel.init_state(&mut rngs);
        let mut times = vec![0.0];
        let mut alive = vec![true];
        let mut trajectories = vec![Trajectory::default()];
        kernel
            .simulate(&mut rngs, &mut states, &mut times, &mut alive, &mut trajectories, 10)
            .unwrap();
        trajectories[0].transitions[0].exit_time
    };

    assert_eq!(run(), run());
}

#[test]
fn discrete_time_uses_unit_increments() {
    let mut model = single_node_model(1000.0);
    model.constants.insert("discrete_time".to_string(), 1.0);
    let kernel = Kernel::compile(&model, true).unwrap();

    let mut rngs = kernel.init_random(&[5]);
    let mut states = kernel.init_state(&mut rngs);
    let mut times = vec![0.0];
    let mut alive = vec![true];
    let mut trajectories = vec![Trajectory::default()];

    kernel
        .simulate(&mut rngs, &mut states, &mut times, &mut alive, &mut trajectories, 10)
        .unwrap();

    let transition = &trajectories[0].transitions[0];
    assert_eq!(transition.exit_time - transition.entry_time, 1.0);
}
