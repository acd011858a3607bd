//! Window-average accumulator.
//!
//! Partitions `[0, max_time]` into `K = ceil(max_time / time_tick)` windows
//! and accumulates, per window and observable node, the fraction of time
//! that node was set, averaged over the sample population. Assumes `K *
//! node_count * sample_count` fits a dense `Vec<f64>`.
//!
//! Discrete-time runs still use this floating-point window math: a
//! transition occupies exactly one tick, so `time_tick` is expected to be 1
//! and the overlap arithmetic below degenerates to integer-aligned windows.

use super::Accumulator;
use crate::runner::Trajectory;
use crate::state::State;

pub struct WindowAverageStats {
    time_tick: f64,
    max_time: f64,
    mask: State,
    node_count: usize,
    sample_count: usize,
    window_count: usize,
    sums: Vec<f64>,
    finalized: bool,
}

impl WindowAverageStats {
    pub fn new(time_tick: f64, max_time: f64, mask: State, node_count: usize, sample_count: usize) -> Self {
        let window_count = (max_time / time_tick).ceil().max(1.0) as usize;
        WindowAverageStats {
            time_tick,
            max_time,
            mask,
            node_count,
            sample_count,
            window_count,
            sums: vec![0.0; window_count * node_count],
            finalized: false,
        }
    }

    fn add_overlap(&mut self, state: &State, entry_time: f64, exit_time: f64) {
        if exit_time <= entry_time {
            return;
        }
        let first_window = (entry_time / self.time_tick).floor().max(0.0) as usize;
        let last_window = ((exit_time / self.time_tick).ceil() as usize)
            .saturating_sub(1)
            .min(self.window_count.saturating_sub(1));

        for w in first_window..=last_window.max(first_window) {
            if w >= self.window_count {
                break;
            }
            let window_start = w as f64 * self.time_tick;
            let window_end = window_start + self.time_tick;
            let overlap = exit_time.min(window_end) - entry_time.max(window_start);
            if overlap <= 0.0 {
                continue;
            }
            for i in 0..self.node_count {
                if self.mask.is_set(i) && state.is_set(i) {
                    self.sums[w * self.node_count + i] += overlap;
                }
            }
        }
    }
}

impl Accumulator for WindowAverageStats {
    fn process_batch(&mut self, trajectories: &[Trajectory], _current_states: &[State], _alive: &[bool], _batch_index: usize) {
        for traj in trajectories {
            for transition in &traj.transitions {
                self.add_overlap(&transition.state, transition.entry_time, transition.exit_time);
            }
            if traj.terminated {
                let tail_start = traj.transitions.last().map(|t| t.exit_time).unwrap_or(traj.start_time);
                if let Some(final_state) = traj.final_state {
                    if tail_start < self.max_time {
                        self.add_overlap(&final_state, tail_start, self.max_time);
                    }
                }
            }
        }
    }

    fn finalize(&mut self) {
        let denom = self.time_tick * self.sample_count as f64;
        for v in &mut self.sums {
            *v /= denom;
        }
        self.finalized = true;
    }

    fn visualize(&self, names: &[String]) {
        println!("Window averages ({} windows of {}):", self.window_count, self.time_tick);
        for w in 0..self.window_count {
            let row: Vec<String> = (0..self.node_count)
                .filter(|&i| self.mask.is_set(i))
                .map(|i| format!("{}={:.4}", names[i], self.sums[w * self.node_count + i]))
                .collect();
            println!("  [{:.2}, {:.2}): {}", w as f64 * self.time_tick, (w + 1) as f64 * self.time_tick, row.join(", "));
        }
    }

    fn write_csv(&self, prefix: &str, names: &[String]) -> std::io::Result<()> {
        let mut header = vec!["window_start".to_string(), "window_end".to_string()];
        header.extend((0..self.node_count).filter(|&i| self.mask.is_set(i)).map(|i| names[i].clone()));

        let rows: Vec<Vec<String>> = (0..self.window_count)
            .map(|w| {
                let mut row = vec![
                    (w as f64 * self.time_tick).to_string(),
                    ((w + 1) as f64 * self.time_tick).to_string(),
                ];
                row.extend(
                    (0..self.node_count)
                        .filter(|&i| self.mask.is_set(i))
                        .map(|i| self.sums[w * self.node_count + i].to_string()),
                );
                row
            })
            .collect();

        crate::io::write_csv_rows(prefix, "window_averages", &header, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_node_mask() -> State {
        let mut s = State::empty(1);
        s.set(0);
        s
    }

    #[test]
    fn single_full_window_transition_averages_to_one() {
        // A node set for the entire window averages to exactly 1.0 across
        // one sample.
        let mask = single_node_mask();
        let mut stats = WindowAverageStats::new(1.0, 2.0, mask, 1, 1);

        let mut set_state = State::empty(1);
        set_state.set(0);

        let traj = Trajectory {
            transitions: vec![crate::runner::Transition { state: set_state, entry_time: 0.0, exit_time: 2.0 }],
            terminated: true,
            final_state: Some(set_state),
            start_time: 0.0,
        };
        stats.process_batch(&[traj], &[], &[false], 0);
        stats.finalize();

        assert!((stats.sums[0] - 1.0).abs() < 1e-9);
        assert!((stats.sums[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn averages_stay_within_unit_bounds() {
        let mask = single_node_mask();
        let mut stats = WindowAverageStats::new(1.0, 3.0, mask, 1, 2);

        let mut set_state = State::empty(1);
        set_state.set(0);
        let unset_state = State::empty(1);

        let traj_a = Trajectory {
            transitions: vec![crate::runner::Transition { state: set_state, entry_time: 0.0, exit_time: 1.5 }],
            terminated: true,
            final_state: Some(set_state),
            start_time: 0.0,
        };
        let traj_b = Trajectory {
            transitions: vec![crate::runner::Transition { state: unset_state, entry_time: 0.0, exit_time: 3.0 }],
            terminated: true,
            final_state: Some(unset_state),
            start_time: 0.0,
        };
        stats.process_batch(&[traj_a, traj_b], &[], &[false, false], 0);
        stats.finalize();

        for &v in &stats.sums {
            assert!((0.0..=1.0).contains(&v), "window average {v} out of [0, 1] bounds");
        }
    }

    #[test]
    fn tail_extends_absorbed_state_to_max_time() {
        let mask = single_node_mask();
        let mut stats = WindowAverageStats::new(1.0, 2.0, mask, 1, 1);

        let mut set_state = State::empty(1);
        set_state.set(0);

        // Absorbed with no transitions this batch; start_time carries the
        // pre-existing simulated time so the tail still fills correctly.
        let traj = Trajectory { terminated: true, final_state: Some(set_state), start_time: 0.0, ..Default::default() };
        stats.process_batch(&[traj], &[], &[false], 0);
        stats.finalize();

        assert!((stats.sums[0] - 1.0).abs() < 1e-9);
        assert!((stats.sums[1] - 1.0).abs() < 1e-9);
    }
}
