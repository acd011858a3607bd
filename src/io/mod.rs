//! CSV report writing for the statistics pipeline, using a flat
//! `<prefix>_<suffix>.csv` naming convention for each accumulator's report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::runner::Trajectory;

fn output_path(prefix: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}_{suffix}.csv"))
}

/// Writes one CSV file at `<prefix>_<suffix>.csv` with the given header and
/// rows, each already rendered as strings.
pub fn write_csv_rows(prefix: &str, suffix: &str, header: &[String], rows: &[Vec<String>]) -> std::io::Result<()> {
    let path = output_path(prefix, suffix);
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", header.join(","))?;
    for row in rows {
        writeln!(writer, "{}", row.join(","))?;
    }
    Ok(())
}

/// Serializes a raw batch of trajectories to a compact binary snapshot. Not
/// used by the CLI's own reporting path (that goes through the CSV
/// accumulators); only by tests that need to inspect a raw batch buffer.
pub fn snapshot_trajectories(trajectories: &[Trajectory]) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(trajectories)
}

/// Inverse of [`snapshot_trajectories`].
pub fn load_trajectories(bytes: &[u8]) -> Result<Vec<Trajectory>, bincode::Error> {
    bincode::deserialize(bytes)
}

/// Writes a pretty-printed JSON debug dump at `<prefix>_<suffix>.json`,
/// alongside the CSV reports, for anything worth inspecting by hand (a run
/// summary, a compiled kernel's node list) that doesn't fit the accumulator
/// CSV shape.
pub fn write_json_dump<T: serde::Serialize>(prefix: &str, suffix: &str, value: &T) -> std::io::Result<()> {
    let path = PathBuf::from(format!("{prefix}_{suffix}.json"));
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn snapshot_trajectories_round_trips_through_bincode() {
        let traj = Trajectory {
            transitions: vec![crate::runner::Transition {
                state: crate::state::State::empty(2),
                entry_time: 0.0,
                exit_time: 1.5,
            }],
            terminated: true,
            final_state: Some(crate::state::State::empty(2)),
            start_time: 0.0,
        };
        let bytes = snapshot_trajectories(&[traj.clone()]).unwrap();
        let restored = load_trajectories(&bytes).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].terminated, traj.terminated);
        assert_eq!(restored[0].transitions.len(), 1);
    }

    #[test]
    fn write_json_dump_creates_pretty_printed_file() {
        #[derive(serde::Serialize)]
        struct Summary {
            node_count: usize,
        }

        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("run").to_string_lossy().to_string();
        write_json_dump(&prefix, "debug", &Summary { node_count: 3 }).unwrap();

        let mut contents = String::new();
        File::open(format!("{prefix}_debug.json")).unwrap().read_to_string(&mut contents).unwrap();
        assert!(contents.contains("\"node_count\": 3"));
    }

    #[test]
    fn write_csv_rows_creates_expected_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("run").to_string_lossy().to_string();

        write_csv_rows(
            &prefix,
            "final_states",
            &["state".to_string(), "probability".to_string()],
            &[vec!["A -- B".to_string(), "0.5".to_string()]],
        )
        .unwrap();

        let mut contents = String::new();
        File::open(format!("{prefix}_final_states.csv"))
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "state,probability\nA -- B,0.5\n");
    }
}
