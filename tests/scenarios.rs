//! Black-box scenarios against the public parser/kernel/runner/stats API,
//! exercising the same `.bnd`/`.cfg` surface `main.rs` drives. CSV output is
//! round-tripped through real files since the accumulators don't expose
//! their internal counts directly.

use std::collections::HashMap;
use std::fs;

use boolnet_sim::kernel::Kernel;
use boolnet_sim::model::{InitialStateEntry, Model, Node};
use boolnet_sim::parser::{parse_bnd, parse_cfg};
use boolnet_sim::runner::{RunnerConfig, TrajectoryRunner};
use boolnet_sim::stats::final_states::FinalStatesStats;
use boolnet_sim::stats::fixed_states::FixedStatesStats;
use boolnet_sim::stats::StatsComposite;
use boolnet_sim::state::State;

fn read_csv_rows(path: &str) -> Vec<Vec<String>> {
    let contents = fs::read_to_string(path).unwrap();
    contents.lines().skip(1).map(|line| line.split(',').map(str::to_string).collect()).collect()
}

/// Scenario A (toy chain, 1 node): `A { logic = !A; rate_up = 1; rate_down =
/// 1; }`, continuous time, fixed at `A = 0`. The node can never absorb (its
/// logic always wants the opposite of its current bit), so every sample runs
/// to `max_time` and the fixed-state probability of `A` converges to 0.5.
#[test]
fn scenario_a_toy_chain_converges_to_fifty_fifty() {
    let nodes = parse_bnd("A { logic = !A; rate_up = 1; rate_down = 1; }").unwrap();
    let model = parse_cfg("max_time = 10; A.istate = 1 [0];", nodes).unwrap();
    model.validate().unwrap();

    let kernel = Kernel::compile(&model, false).unwrap();
    let sample_count = 20_000;
    let mask = model.noninternals_mask();

    let mut stats = StatsComposite::new();
    stats.add(Box::new(FixedStatesStats::new(mask, model.node_count(), sample_count)));

    let config = RunnerConfig { sample_count, trajectory_len_limit: 64, trajectory_batch_limit: 50 };
    let runner = TrajectoryRunner::new(&kernel, config);
    let seeds: Vec<u64> = (0..sample_count as u64).collect();
    runner.run(&mut stats, &seeds).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("scenario_a").to_string_lossy().to_string();
    stats.write_csv(&prefix, &["A".to_string()]).unwrap();

    let rows = read_csv_rows(&format!("{prefix}_fixed_states.csv"));
    assert_eq!(rows.len(), 1);
    let probability: f64 = rows[0][1].parse().unwrap();
    assert!((probability - 0.5).abs() < 0.03, "fixed-state probability {probability} not near 0.5");
}

/// Scenario B (absorbing state): two nodes whose logic just mirrors their
/// own current value (`A.logic = A`, `B.logic = A`), so every sample is
/// already absorbed at t = 0 and the final-state mass must equal the
/// initial-distribution mass exactly.
#[test]
fn scenario_b_absorbing_state_preserves_initial_mass() {
    let mut constants = HashMap::new();
    constants.insert("max_time".to_string(), 10.0);

    let mut state_00 = State::empty(2);
    let mut state_11 = State::empty(2);
    state_11.set(0);
    state_11.set(1);

    let model = Model {
        nodes: vec![
            Node { name: "A".to_string(), logic: boolnet_sim::expr::Expr::node("A"), rate_up: boolnet_sim::expr::Expr::literal(1.0), rate_down: boolnet_sim::expr::Expr::literal(1.0), internal: false },
            Node { name: "B".to_string(), logic: boolnet_sim::expr::Expr::node("A"), rate_up: boolnet_sim::expr::Expr::literal(1.0), rate_down: boolnet_sim::expr::Expr::literal(1.0), internal: false },
        ],
        constants,
        variables: HashMap::new(),
        initial_distribution: vec![
            InitialStateEntry { state: state_00, probability: 0.5 },
            InitialStateEntry { state: state_11, probability: 0.5 },
        ],
    };
    model.validate().unwrap();

    let kernel = Kernel::compile(&model, false).unwrap();
    let sample_count = 4000;
    let mask = model.noninternals_mask();

    let mut stats = StatsComposite::new();
    stats.add(Box::new(FinalStatesStats::new(mask, sample_count)));

    let config = RunnerConfig { sample_count, trajectory_len_limit: 16, trajectory_batch_limit: 10 };
    let runner = TrajectoryRunner::new(&kernel, config);
    let seeds: Vec<u64> = (0..sample_count as u64).collect();
    runner.run(&mut stats, &seeds).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("scenario_b").to_string_lossy().to_string();
    stats.write_csv(&prefix, &["A".to_string(), "B".to_string()]).unwrap();

    let rows = read_csv_rows(&format!("{prefix}_final_states.csv"));
    // Every sample is absorbed with no transitions at all, so the histogram
    // has exactly the two initial states, each at mass 0.5.
    assert_eq!(rows.len(), 2);
    for row in &rows {
        let probability: f64 = row[1].parse().unwrap();
        assert_eq!(probability, 0.5);
    }
}

/// Scenario E (initial distribution): `A.istate = 0.3 [1], 0.7 [0]` should
/// reproduce the 0.3 marginal empirically, independent of dynamics, by
/// fixing `max_time = 0` so every sample is read back at its initial state.
#[test]
fn scenario_e_initial_distribution_mixture_is_recovered() {
    let nodes = parse_bnd("A { logic = A; rate_up = 1; rate_down = 1; }").unwrap();
    let model = parse_cfg("max_time = 0; A.istate = 0.3 [1], 0.7 [0];", nodes).unwrap();
    model.validate().unwrap();

    let kernel = Kernel::compile(&model, false).unwrap();
    let sample_count = 20_000;
    let mask = model.noninternals_mask();

    let mut stats = StatsComposite::new();
    stats.add(Box::new(FixedStatesStats::new(mask, model.node_count(), sample_count)));

    let config = RunnerConfig { sample_count, trajectory_len_limit: 1, trajectory_batch_limit: 5 };
    let runner = TrajectoryRunner::new(&kernel, config);
    let seeds: Vec<u64> = (0..sample_count as u64).collect();
    runner.run(&mut stats, &seeds).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("scenario_e").to_string_lossy().to_string();
    stats.write_csv(&prefix, &["A".to_string()]).unwrap();

    let rows = read_csv_rows(&format!("{prefix}_fixed_states.csv"));
    let probability: f64 = rows[0][1].parse().unwrap();
    assert!((probability - 0.3).abs() < 0.01, "empirical A=1 frequency {probability} not within 1% of 0.3");
}
