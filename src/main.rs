use std::fs;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use boolnet_sim::cli::Cli;
use boolnet_sim::error::SimError;
use boolnet_sim::kernel::Kernel;
use boolnet_sim::parser::{parse_bnd, parse_cfg};
use boolnet_sim::runner::{RunnerConfig, TrajectoryRunner};
use boolnet_sim::stats::final_states::FinalStatesStats;
use boolnet_sim::stats::fixed_states::FixedStatesStats;
use boolnet_sim::stats::window_average::WindowAverageStats;
use boolnet_sim::stats::StatsComposite;

/// Run metadata dumped alongside the CSV reports for ad hoc inspection -
/// not part of the accumulator output, so it doesn't fit a CSV shape.
#[derive(serde::Serialize)]
struct RunSummary {
    node_count: usize,
    observable_count: usize,
    sample_count: usize,
    max_time: f64,
    discrete_time: bool,
}

/// Per-sample transitions buffered per batch before handing off to the
/// statistics pipeline. Typical values are 100-1000; higher limits trade
/// memory for fewer batch round-trips on models that take a while to absorb.
const TRAJECTORY_LEN_LIMIT: usize = 200;
/// Batches attempted before giving up on stragglers that never absorb.
const TRAJECTORY_BATCH_LIMIT: usize = 2000;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), SimError> {
    let bnd_text = fs::read_to_string(&cli.bnd_file)?;
    let cfg_text = fs::read_to_string(&cli.cfg_file)?;

    let nodes = parse_bnd(&bnd_text).map_err(SimError::Config)?;
    let model = parse_cfg(&cfg_text, nodes).map_err(SimError::Config)?;
    model.validate().map_err(SimError::Config)?;

    let discrete_time = model.constants.get("discrete_time").copied().unwrap_or(0.0) != 0.0;
    let max_time = model.constants.get("max_time").copied().unwrap_or(0.0);
    let time_tick = model.constants.get("time_tick").copied().unwrap_or(1.0);
    let sample_count = model.constants.get("sample_count").copied().unwrap_or(1000.0) as usize;

    info!(
        "compiling kernel for {} nodes ({} observable), discrete_time={}",
        model.node_count(),
        model.observable_count(),
        discrete_time
    );
    let kernel = Kernel::compile(&model, discrete_time)?;

    let names: Vec<String> = model.nodes.iter().map(|n| n.name.clone()).collect();
    let mask = model.noninternals_mask();
    let node_count = model.node_count();

    let mut stats = StatsComposite::new();
    stats.add(Box::new(FinalStatesStats::new(mask, sample_count)));
    stats.add(Box::new(FixedStatesStats::new(mask, node_count, sample_count)));
    stats.add(Box::new(WindowAverageStats::new(time_tick, max_time, mask, node_count, sample_count)));

    let config = RunnerConfig {
        sample_count,
        trajectory_len_limit: TRAJECTORY_LEN_LIMIT,
        trajectory_batch_limit: TRAJECTORY_BATCH_LIMIT,
    };
    let runner = TrajectoryRunner::new(&kernel, config);

    let seeds: Vec<u64> = (0..sample_count as u64).collect();
    info!("running {sample_count} samples");
    runner.run(&mut stats, &seeds)?;

    match &cli.output_prefix {
        Some(prefix) => {
            info!("writing CSV reports with prefix {prefix}");
            stats.write_csv(prefix, &names)?;
            let summary = RunSummary {
                node_count: model.node_count(),
                observable_count: model.observable_count(),
                sample_count,
                max_time,
                discrete_time,
            };
            boolnet_sim::io::write_json_dump(prefix, "debug", &summary)?;
        }
        None => stats.visualize(&names),
    }

    Ok(())
}
