//! CP solver interface and the starting-point verifier.

use std::time::{Duration, Instant};

use super::model::CpModel;
use super::variables::IntervalId;
use crate::models::Delay;
use crate::verify::verify;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible (but not necessarily optimal) solution found.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// No solution found within the budget.
    Unknown,
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum solve time.
    pub time_limit: Duration,
    /// Number of parallel workers.
    pub workers: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(600),
            workers: 1,
        }
    }
}

impl SolverConfig {
    /// Sets the time limit.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective value of the returned solution.
    pub objective: Option<Delay>,
    /// Best proven lower bound on the objective.
    pub bound: Option<Delay>,
    /// Start time of every interval, indexed by [`IntervalId`]. Empty when
    /// no solution was found.
    pub starts: Vec<Delay>,
    /// Wall-clock time spent solving.
    pub solve_time: Duration,
    /// Whether the search stopped because the time budget ran out.
    pub timed_out: bool,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective: None,
            bound: None,
            starts: Vec::new(),
            solve_time: Duration::ZERO,
            timed_out: false,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    /// Whether the solution is proven optimal.
    pub fn is_optimal(&self) -> bool {
        self.status == SolverStatus::Optimal
    }

    /// Start time of an interval, if a solution was found.
    pub fn start(&self, id: IntervalId) -> Option<Delay> {
        self.starts.get(id.0).copied()
    }

    /// Relative gap `(objective - bound) / objective`.
    pub fn gap(&self) -> Option<f64> {
        let (objective, bound) = (self.objective?, self.bound?);
        if objective == 0 {
            return Some(0.0);
        }
        Some((objective - bound) as f64 / objective as f64)
    }
}

/// Trait for CP solver implementations.
///
/// Implementors may wrap an external engine or provide a search of their
/// own. Running out of time is not an error: return the best solution
/// found so far (possibly none) with `timed_out` set.
pub trait CpSolver {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

/// Returns the model's starting point if it is complete and feasible.
///
/// Replays a previously computed schedule through the model without any
/// search: useful to check a stored solution against a (possibly
/// changed) instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartingPointSolver;

impl StartingPointSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for StartingPointSolver {
    fn solve(&self, model: &CpModel, _config: &SolverConfig) -> CpSolution {
        if model.validate().is_err() {
            return CpSolution::empty(SolverStatus::ModelInvalid);
        }
        let started = Instant::now();

        let Some(starts) = model.starting_starts() else {
            return CpSolution::empty(SolverStatus::Unknown);
        };
        let violations = verify(model, &starts);
        if !violations.is_empty() {
            tracing::debug!(
                violations = violations.len(),
                first = %violations[0].message,
                "starting point rejected"
            );
            let mut solution = CpSolution::empty(SolverStatus::Infeasible);
            solution.solve_time = started.elapsed();
            return solution;
        }

        let objective = model.objective_value(&starts);
        CpSolution {
            status: SolverStatus::Feasible,
            objective: Some(objective),
            bound: None,
            starts,
            solve_time: started.elapsed(),
            timed_out: false,
        }
    }
}
