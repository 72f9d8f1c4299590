//! Solution application and reporting.
//!
//! - **Warm starts**: [`read_warm_start`] / [`apply_solution`] import a
//!   `module -> job -> operation -> start` timing table into an encoded
//!   line.
//! - **Reporting**: [`report`] turns a [`crate::cp::CpSolution`] into a
//!   [`ResultRecord`], the only artifact persisted by a run.
//! - **Decoding**: [`decode_solution`] writes solver start times back into
//!   the production line.

mod report;
mod warm_start;

pub use report::{
    export_path, report, result_path, timing_table, ResultRecord, INFEASIBLE_ERROR,
    MODEL_INVALID_ERROR, NO_SOLUTION_ERROR, TIMEOUT_ERROR,
};
pub use warm_start::{apply_solution, read_warm_start, write_warm_start};

use crate::cp::CpSolution;
use crate::encoder::EncodedLine;
use crate::error::Result;
use crate::models::{ProductionLine, TimingTable};

/// Copies the start times of `solution` into the operations of `line`.
///
/// Returns the decoded timing table; it is empty when the solver found
/// nothing.
pub fn decode_solution(
    encoded: &EncodedLine,
    solution: &CpSolution,
    line: &mut ProductionLine,
) -> Result<TimingTable> {
    let timing = timing_table(encoded, solution);
    line.apply_start_times(&timing)?;
    Ok(timing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShopConfig;
    use crate::cp::{CpSolver, EnumerationSolver, SolverConfig, SolverStatus, StartingPointSolver};
    use crate::encoder::LineEncoder;
    use crate::generator::homogeneous_case;
    use crate::verify::verify;
    use std::time::Duration;

    #[test]
    fn test_warm_start_roundtrip_reproduces_starts() {
        let mut line = homogeneous_case(2, &ShopConfig::default());
        let mut encoded = LineEncoder::new(&line).encode();

        let solved = EnumerationSolver::new()
            .solve(encoded.model(), &SolverConfig::default().with_time_limit(Duration::from_secs(30)));
        assert!(solved.is_solution_found());
        let supplied = timing_table(&encoded, &solved);

        apply_solution(&mut encoded, &mut line, &supplied).unwrap();
        let replayed = StartingPointSolver::new().solve(encoded.model(), &SolverConfig::default());
        assert_eq!(replayed.status, SolverStatus::Feasible);
        assert!(verify(encoded.model(), &replayed.starts).is_empty());

        let record = report(&encoded, &replayed, Duration::from_secs(30));
        assert_eq!(record.solution, supplied);
        assert_eq!(record.min_makespan, solved.objective.unwrap() as f64);

        let decoded = decode_solution(&encoded, &replayed, &mut line).unwrap();
        assert_eq!(decoded, supplied);
        assert_eq!(line.timing_table(), supplied);
    }
}
