//! # Trajectory runner - Population and Batch Loop
//!
//! Owns the population (one RNG, state, and simulated time per sample) and
//! the per-batch trajectory buffers, and drives the batch loop described in
//! the kernel design: call `init_rng`/`init_state` once, then repeatedly call
//! `simulate` and hand the result to the statistics composite until every
//! sample is absorbed or the batch cap is hit.
//!
//! The runner never inspects trajectory contents itself: it allocates the
//! buffers, zeroes them each batch, and forwards them to
//! [`crate::stats::StatsComposite`].

use rand::rngs::StdRng;

use crate::error::RuntimeError;
use crate::kernel::Kernel;
use crate::stats::StatsComposite;

/// One recorded state transition within a sample's trajectory.
///
/// `Serialize`/`Deserialize` back the binary batch snapshot in
/// [`crate::io::snapshot_trajectories`], used only by tests that need to
/// inspect a raw batch buffer rather than an accumulator's summary.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Transition {
    pub state: crate::state::State,
    pub entry_time: f64,
    pub exit_time: f64,
}

/// A single sample's trajectory for one batch: an append-only list of
/// transitions, capped at `trajectory_len_limit`, plus whether the sample
/// terminated (absorbed or timed out) during this batch.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Trajectory {
    pub transitions: Vec<Transition>,
    pub terminated: bool,
    pub final_state: Option<crate::state::State>,
    /// The sample's simulated time at the start of this batch, used by the
    /// window-average accumulator to fill the tail interval of a sample
    /// that absorbs without recording any transition this batch.
    pub start_time: f64,
}

impl Trajectory {
    fn clear(&mut self) {
        self.transitions.clear();
        self.terminated = false;
        self.final_state = None;
    }
}

/// Runtime configuration for the batch loop: how many samples to simulate,
/// how many transitions to buffer per sample per batch, and how many batches
/// to run before giving up on stragglers.
pub struct RunnerConfig {
    pub sample_count: usize,
    pub trajectory_len_limit: usize,
    pub trajectory_batch_limit: usize,
}

pub struct TrajectoryRunner<'a> {
    kernel: &'a Kernel,
    config: RunnerConfig,
}

impl<'a> TrajectoryRunner<'a> {
    pub fn new(kernel: &'a Kernel, config: RunnerConfig) -> Self {
        TrajectoryRunner { kernel, config }
    }

    /// Runs the full batch loop to completion, feeding every batch to
    /// `stats`. `seeds` must supply one seed per sample.
    pub fn run(&self, stats: &mut StatsComposite, seeds: &[u64]) -> Result<(), RuntimeError> {
        let sample_count = self.config.sample_count;
        assert_eq!(seeds.len(), sample_count, "one seed per sample is required");

        let mut rngs: Vec<StdRng> = self.kernel.init_random(seeds);
        let mut states = self.kernel.init_state(&mut rngs);
        let mut times = vec![0.0_f64; sample_count];
        let mut alive = vec![true; sample_count];
        let mut trajectories: Vec<Trajectory> = (0..sample_count).map(|_| Trajectory::default()).collect();

        let mut batch = 0usize;
        while alive.iter().any(|&a| a) && batch < self.config.trajectory_batch_limit {
            for (t, &sample_time) in trajectories.iter_mut().zip(times.iter()) {
                t.clear();
                t.start_time = sample_time;
            }

            self.kernel.simulate(
                &mut rngs,
                &mut states,
                &mut times,
                &mut alive,
                &mut trajectories,
                self.config.trajectory_len_limit,
            )?;

            stats.process_batch(&trajectories, &states, &alive, batch);
            batch += 1;
        }

        stats.finalize();
        Ok(())
    }
}
