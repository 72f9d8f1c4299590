//! Result records.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cp::{CpSolution, SolverStatus};
use crate::encoder::EncodedLine;
use crate::error::Result;
use crate::models::TimingTable;

/// Error tag of a run whose budget ran out before any solution was found.
pub const TIMEOUT_ERROR: &str = "time-out";
/// Error tag of a run proven infeasible.
pub const INFEASIBLE_ERROR: &str = "infeasible";
/// Error tag of a run the solver rejected as malformed.
pub const MODEL_INVALID_ERROR: &str = "model-invalid";
/// Error tag of a run that ended without a solution or a proof.
pub const NO_SOLUTION_ERROR: &str = "no-solution";

/// Outcome of one solve, persisted as a CBOR map.
///
/// Times are in seconds. When no solution was found, makespan, bound and
/// gap are `f64::INFINITY` and `error` names the outcome. Only a run that
/// exhausted its budget sets `timeout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub min_makespan: f64,
    pub lower_bound: f64,
    pub total_time: f64,
    pub time_per_job: f64,
    pub time_out_value: f64,
    pub optimality_gap: f64,
    pub optimal: bool,
    pub solved: bool,
    pub timeout: bool,
    pub solution: TimingTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRecord {
    /// Writes the record, creating parent directories as needed.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        ciborium::into_writer(self, writer)?;
        tracing::info!(path = %path.display(), "result stored");
        Ok(())
    }

    /// Reads a persisted record.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(ciborium::from_reader(reader)?)
    }
}

/// Start times of every encoded operation in `solution`.
///
/// Empty when the solution holds no start times.
pub fn timing_table(encoded: &EncodedLine, solution: &CpSolution) -> TimingTable {
    let mut timing = TimingTable::new();
    for (module, key, id) in encoded.operations() {
        let Some(start) = solution.start(id) else {
            continue;
        };
        timing
            .entry(module.to_string())
            .or_default()
            .entry(key.job.to_string())
            .or_default()
            .insert(key.op.to_string(), start);
    }
    timing
}

/// Builds the result record of a solve.
pub fn report(encoded: &EncodedLine, solution: &CpSolution, time_limit: Duration) -> ResultRecord {
    let jobs = encoded.last_module_jobs().max(1) as f64;
    let limit = time_limit.as_secs_f64();

    let objective = match solution.objective {
        Some(objective) if solution.is_solution_found() => objective,
        _ => return unsolved(solution, limit, jobs),
    };

    let total = solution.solve_time.as_secs_f64();
    let bound = solution.bound.unwrap_or(0);
    let gap = if objective == 0 {
        0.0
    } else {
        (objective - bound) as f64 / objective as f64
    };
    ResultRecord {
        min_makespan: objective as f64,
        lower_bound: bound as f64,
        total_time: total,
        time_per_job: total / jobs,
        time_out_value: limit,
        optimality_gap: gap,
        optimal: solution.is_optimal(),
        solved: true,
        timeout: solution.timed_out,
        solution: timing_table(encoded, solution),
        error: None,
    }
}

/// Sentinel record of a solve without solution.
///
/// A timed-out run reports the full budget as its solve time.
fn unsolved(solution: &CpSolution, limit: f64, jobs: f64) -> ResultRecord {
    let tag = if solution.timed_out {
        TIMEOUT_ERROR
    } else {
        match solution.status {
            SolverStatus::Infeasible => INFEASIBLE_ERROR,
            SolverStatus::ModelInvalid => MODEL_INVALID_ERROR,
            _ => NO_SOLUTION_ERROR,
        }
    };
    let total = if solution.timed_out {
        limit
    } else {
        solution.solve_time.as_secs_f64()
    };
    ResultRecord {
        min_makespan: f64::INFINITY,
        lower_bound: f64::INFINITY,
        total_time: total,
        time_per_job: total / jobs,
        time_out_value: limit,
        optimality_gap: f64::INFINITY,
        optimal: false,
        solved: false,
        timeout: solution.timed_out,
        solution: TimingTable::new(),
        error: Some(tag.to_string()),
    }
}

/// Result file of a run: `.cbor` appended to the output path.
pub fn result_path(output: &Path) -> PathBuf {
    let mut name: OsString = output.as_os_str().to_os_string();
    name.push(".cbor");
    PathBuf::from(name)
}

/// Model export file of a run: the output path with extension `cpo`.
pub fn export_path(output: &Path) -> PathBuf {
    output.with_extension("cpo")
}
