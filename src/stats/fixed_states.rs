//! ## 4.6.2 Fixed-states accumulator
//!
//! Tracks, per observable node, the fraction of samples that had that node
//! set at their final (absorption or timeout) state. The original source
//! monomorphizes this per word-count (`fixed_states_stats<N>`); this crate's
//! runtime-sized [`State`] makes that unnecessary, so one implementation
//! covers every node count up to the 256-node limit.

use super::Accumulator;
use crate::runner::Trajectory;
use crate::state::State;

pub struct FixedStatesStats {
    mask: State,
    node_count: usize,
    sample_count: usize,
    counts: Vec<u64>,
    probabilities: Vec<f64>,
}

impl FixedStatesStats {
    pub fn new(mask: State, node_count: usize, sample_count: usize) -> Self {
        FixedStatesStats { mask, node_count, sample_count, counts: vec![0; node_count], probabilities: Vec::new() }
    }
}

impl Accumulator for FixedStatesStats {
    fn process_batch(&mut self, trajectories: &[Trajectory], _current_states: &[State], _alive: &[bool], _batch_index: usize) {
        for traj in trajectories {
            if !traj.terminated {
                continue;
            }
            let Some(final_state) = traj.final_state else { continue };
            for i in 0..self.node_count {
                if self.mask.is_set(i) && final_state.is_set(i) {
                    self.counts[i] += 1;
                }
            }
        }
    }

    fn finalize(&mut self) {
        let total = self.sample_count as f64;
        self.probabilities = self.counts.iter().map(|&c| c as f64 / total).collect();
    }

    fn visualize(&self, names: &[String]) {
        println!("Fixed-state probabilities:");
        for (i, probability) in self.probabilities.iter().enumerate() {
            if self.mask.is_set(i) {
                println!("  {}: {:.6}", names[i], probability);
            }
        }
    }

    fn write_csv(&self, prefix: &str, names: &[String]) -> std::io::Result<()> {
        let header = vec!["node".to_string(), "probability".to_string()];
        let rows: Vec<Vec<String>> = (0..self.node_count)
            .filter(|&i| self.mask.is_set(i))
            .map(|i| vec![names[i].clone(), self.probabilities[i].to_string()])
            .collect();
        crate::io::write_csv_rows(prefix, "fixed_states", &header, &rows)
    }
}
