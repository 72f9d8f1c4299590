//! Load, encode, solve and report pipeline.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::RunConfig;
use crate::cp::CpSolver;
use crate::encoder::LineEncoder;
use crate::error::{Error, Result};
use crate::loader::load_line;
use crate::solution::{
    apply_solution, decode_solution, export_path, read_warm_start, report, result_path,
    ResultRecord,
};

/// Inputs of one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// JSON instance document.
    pub input: PathBuf,
    /// Output stem; the result lands in `<output>.cbor`.
    pub output: PathBuf,
    /// CBOR warm-start file.
    pub warm_start: Option<PathBuf>,
    pub config: RunConfig,
}

impl RunOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    /// Sets the warm-start file.
    pub fn with_warm_start(mut self, path: impl Into<PathBuf>) -> Self {
        self.warm_start = Some(path.into());
        self
    }

    /// Sets the run configuration.
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }
}

/// Runs the full pipeline and persists the result record.
///
/// A solver that finds nothing is not an error: the returned record
/// carries the sentinel values and names the outcome in `error`.
///
/// # Errors
/// [`Error::FileNotFound`] for a missing warm-start file (checked before
/// anything is loaded), then loader and warm-start errors, then I/O
/// errors while writing the export or the result.
pub fn run(options: &RunOptions, solver: &impl CpSolver) -> Result<ResultRecord> {
    if let Some(path) = &options.warm_start {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let started = Instant::now();
    let mut line = load_line(&options.input, &options.config.shop)?;
    let mut encoded = LineEncoder::new(&line).encode();
    tracing::info!(
        input = %options.input.display(),
        intervals = encoded.model().interval_count(),
        constraints = encoded.model().constraint_count(),
        "model built"
    );

    if let Some(path) = &options.warm_start {
        let timing = read_warm_start(path)?;
        let hints = apply_solution(&mut encoded, &mut line, &timing)?;
        tracing::info!(path = %path.display(), hints, "warm start loaded");
    }

    if options.config.export {
        let path = export_path(&options.output);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&path)?);
        encoded.model().export(&mut writer)?;
        tracing::info!(path = %path.display(), "model exported");
    }

    let solver_config = options.config.solver_config();
    let solution = solver.solve(encoded.model(), &solver_config);
    tracing::info!(
        status = ?solution.status,
        objective = ?solution.objective,
        bound = ?solution.bound,
        timed_out = solution.timed_out,
        solve_ms = solution.solve_time.as_millis() as u64,
        "solve finished"
    );

    decode_solution(&encoded, &solution, &mut line)?;
    let record = report(&encoded, &solution, solver_config.time_limit);
    record.persist(result_path(&options.output))?;
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "run complete");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{EnumerationSolver, StartingPointSolver};

    const TWO_JOBS: &str = r#"{
        "type": "FORPFSSPSD",
        "modules": [{
            "jobs": 2, "operations": 1,
            "flow_vector": [
                {"job": 0, "index": 0, "machine": 0},
                {"job": 1, "index": 0, "machine": 0}
            ],
            "processing_times": {"entries": [
                {"j": 0, "op": 0, "value": 3},
                {"j": 1, "op": 0, "value": 2}
            ]}
        }]
    }"#;

    fn workspace() -> (tempfile::TempDir, RunOptions) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("line.json");
        fs::write(&input, TWO_JOBS).unwrap();
        let options = RunOptions::new(input, dir.path().join("out").join("line.json"));
        (dir, options)
    }

    #[test]
    fn test_run_solves_and_persists() {
        let (_dir, options) = workspace();
        let mut config = RunConfig::default().with_time_limit_secs(10);
        config.export = true;
        let options = options.with_config(config);

        let record = run(&options, &EnumerationSolver::new()).unwrap();
        assert!(record.solved);
        assert!(record.optimal);
        assert_eq!(record.min_makespan, 5.0);
        assert_eq!(record.solution["0"]["0"]["0"], 0);
        assert_eq!(record.solution["0"]["1"]["0"], 3);
        assert_eq!(record.time_out_value, 10.0);

        let stored = ResultRecord::load(result_path(&options.output)).unwrap();
        assert_eq!(stored, record);
        let exported = fs::read_to_string(export_path(&options.output)).unwrap();
        assert!(exported.contains("minimize(endOf(O0_1_0));"));
    }

    #[test]
    fn test_result_record_is_a_warm_start() {
        let (_dir, options) = workspace();
        let first = run(&options, &EnumerationSolver::new()).unwrap();

        let replay = RunOptions {
            output: options.output.with_file_name("replay.json"),
            ..options.clone()
        }
        .with_warm_start(result_path(&options.output));
        let second = run(&replay, &StartingPointSolver::new()).unwrap();

        assert!(second.solved);
        assert_eq!(second.solution, first.solution);
        assert_eq!(second.min_makespan, first.min_makespan);
    }

    #[test]
    fn test_infeasible_warm_start_is_recorded_as_infeasible() {
        let (dir, options) = workspace();
        let start = dir.path().join("overlap.cbor");
        let mut timing = crate::models::TimingTable::new();
        let jobs = timing.entry("0".into()).or_default();
        jobs.entry("0".into()).or_default().insert("0".into(), 0);
        jobs.entry("1".into()).or_default().insert("0".into(), 1);
        crate::solution::write_warm_start(&start, &timing).unwrap();

        let replay = options.clone().with_warm_start(&start);
        let record = run(&replay, &StartingPointSolver::new()).unwrap();
        assert!(!record.solved);
        assert!(!record.timeout);
        assert!(record.min_makespan.is_infinite());
        assert_eq!(record.error.as_deref(), Some(crate::solution::INFEASIBLE_ERROR));

        let stored = ResultRecord::load(result_path(&options.output)).unwrap();
        assert_eq!(stored.error, record.error);
    }

    #[test]
    fn test_missing_warm_start_fails_before_loading() {
        let options = RunOptions::new("/nonexistent/line.json", "/nonexistent/out")
            .with_warm_start("/nonexistent/start.cbor");
        let err = run(&options, &EnumerationSolver::new()).unwrap_err();
        match err {
            Error::FileNotFound(path) => assert_eq!(path, PathBuf::from("/nonexistent/start.cbor")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
