//! # Statistics pipeline - Composite of Independent Accumulators
//!
//! Every accumulator shares the same contract: `process_batch` folds one
//! batch's trajectories into its running totals, `finalize` normalizes them,
//! and `visualize`/`write_csv` render the result. [`StatsComposite`] owns an
//! ordered list of accumulators and fans out each call in turn; accumulators
//! never share state, so their relative order does not affect the result.

pub mod final_states;
pub mod fixed_states;
pub mod window_average;

use crate::runner::Trajectory;
use crate::state::State;

pub trait Accumulator {
    fn process_batch(&mut self, trajectories: &[Trajectory], current_states: &[State], alive: &[bool], batch_index: usize);
    fn finalize(&mut self);
    fn visualize(&self, names: &[String]);
    fn write_csv(&self, prefix: &str, names: &[String]) -> std::io::Result<()>;
}

#[derive(Default)]
pub struct StatsComposite {
    accumulators: Vec<Box<dyn Accumulator>>,
}

impl StatsComposite {
    pub fn new() -> Self {
        StatsComposite { accumulators: Vec::new() }
    }

    pub fn add(&mut self, accumulator: Box<dyn Accumulator>) {
        self.accumulators.push(accumulator);
    }

    pub fn process_batch(&mut self, trajectories: &[Trajectory], current_states: &[State], alive: &[bool], batch_index: usize) {
        for accumulator in &mut self.accumulators {
            accumulator.process_batch(trajectories, current_states, alive, batch_index);
        }
    }

    pub fn finalize(&mut self) {
        for accumulator in &mut self.accumulators {
            accumulator.finalize();
        }
    }

    pub fn visualize(&self, names: &[String]) {
        for accumulator in &self.accumulators {
            accumulator.visualize(names);
        }
    }

    pub fn write_csv(&self, prefix: &str, names: &[String]) -> std::io::Result<()> {
        for accumulator in &self.accumulators {
            accumulator.write_csv(prefix, names)?;
        }
        Ok(())
    }
}
