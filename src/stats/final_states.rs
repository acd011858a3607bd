//! Final-states accumulator.
//!
//! Counts, across the whole run, how many samples terminated (absorbed or
//! timed out) in each distinct observable-masked final state. `finalize`
//! normalizes counts to probabilities by `sample_count` and sorts them
//! descending, breaking ties on the state itself so the row order is
//! reproducible: two runs over the same model and seeds must emit the same
//! CSV, and sorting a `HashMap`'s entries by probability alone leaves equal
//! probabilities in whatever order the hash map happened to iterate.

use std::collections::HashMap;

use super::Accumulator;
use crate::runner::Trajectory;
use crate::state::State;

pub struct FinalStatesStats {
    mask: State,
    sample_count: usize,
    counts: HashMap<State, u64>,
    probabilities: Vec<(State, f64)>,
}

impl FinalStatesStats {
    pub fn new(mask: State, sample_count: usize) -> Self {
        FinalStatesStats { mask, sample_count, counts: HashMap::new(), probabilities: Vec::new() }
    }
}

impl Accumulator for FinalStatesStats {
    fn process_batch(&mut self, trajectories: &[Trajectory], _current_states: &[State], _alive: &[bool], _batch_index: usize) {
        for traj in trajectories {
            if traj.terminated {
                if let Some(final_state) = traj.final_state {
                    let masked = final_state.and(&self.mask);
                    *self.counts.entry(masked).or_insert(0) += 1;
                }
            }
        }
    }

    fn finalize(&mut self) {
        let total = self.sample_count as f64;
        let mut entries: Vec<(State, f64)> =
            self.counts.iter().map(|(state, count)| (*state, *count as f64 / total)).collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("probabilities are never NaN").then(a.0.cmp(&b.0)));
        self.probabilities = entries;
    }

    fn visualize(&self, names: &[String]) {
        println!("Final states:");
        for (state, probability) in &self.probabilities {
            println!("  {}: {:.6}", state.display_with_names(names), probability);
        }
    }

    fn write_csv(&self, prefix: &str, names: &[String]) -> std::io::Result<()> {
        let header = vec!["state".to_string(), "probability".to_string()];
        let rows: Vec<Vec<String>> = self
            .probabilities
            .iter()
            .map(|(state, probability)| vec![state.display_with_names(names), probability.to_string()])
            .collect();
        crate::io::write_csv_rows(prefix, "final_states", &header, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_bits(node_count: usize, bits: &[usize]) -> State {
        let mut s = State::empty(node_count);
        for &b in bits {
            s.set(b);
        }
        s
    }

    fn terminated(state: State) -> Trajectory {
        Trajectory { terminated: true, final_state: Some(state), ..Default::default() }
    }

    #[test]
    fn finalize_normalizes_by_sample_count() {
        let mask = state_with_bits(2, &[0, 1]);
        let mut stats = FinalStatesStats::new(mask, 4);

        let batch = vec![
            terminated(state_with_bits(2, &[0])),
            terminated(state_with_bits(2, &[0])),
            terminated(state_with_bits(2, &[1])),
            terminated(state_with_bits(2, &[])),
        ];
        stats.process_batch(&batch, &[], &[false; 4], 0);
        stats.finalize();

        let total: f64 = stats.probabilities.iter().map(|(_, p)| *p).sum();
        assert!((total - 1.0).abs() < 1e-9);

        let top = stats.probabilities[0];
        assert_eq!(top.1, 0.5);
    }

    #[test]
    fn tied_probabilities_break_ties_by_state_order() {
        let mask = state_with_bits(2, &[0, 1]);
        let mut stats = FinalStatesStats::new(mask, 2);
        let batch = vec![terminated(state_with_bits(2, &[0, 1])), terminated(state_with_bits(2, &[]))];
        stats.process_batch(&batch, &[], &[false, false], 0);
        stats.finalize();

        assert_eq!(stats.probabilities.len(), 2);
        assert_eq!(stats.probabilities[0].1, stats.probabilities[1].1);
        assert!(stats.probabilities[0].0 < stats.probabilities[1].0);
    }

    #[test]
    fn non_terminated_samples_are_ignored() {
        let mask = state_with_bits(1, &[0]);
        let mut stats = FinalStatesStats::new(mask, 2);
        let mut alive = Trajectory::default();
        alive.terminated = false;
        stats.process_batch(&[alive], &[], &[true], 0);
        stats.finalize();
        assert!(stats.probabilities.is_empty());
    }

    #[test]
    fn masking_hides_internal_node_bits() {
        let mask = state_with_bits(2, &[0]); // node 1 is internal
        let mut stats = FinalStatesStats::new(mask, 2);
        let batch = vec![
            terminated(state_with_bits(2, &[0, 1])),
            terminated(state_with_bits(2, &[0])),
        ];
        stats.process_batch(&batch, &[], &[false, false], 0);
        stats.finalize();
        assert_eq!(stats.probabilities.len(), 1);
        assert_eq!(stats.probabilities[0].1, 1.0);
    }
}
