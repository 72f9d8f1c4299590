//! Constraint Programming (CP) layer.
//!
//! A solver-agnostic model of fixed-size interval variables, machine
//! sequences with transition matrices, and the constraints a flow-shop
//! encoding needs.
//!
//! # Key Components
//!
//! - **Variables**: [`IntervalVar`], [`SequenceVar`], [`TransitionMatrix`]
//! - **Constraints**: [`Constraint`]: Precedence, Deadline, NoOverlap, IfThen
//! - **Model**: [`CpModel`]: variables, constraints, objective and warm start
//! - **Solver**: [`CpSolver`] trait, with [`EnumerationSolver`] (exhaustive
//!   reference search) and [`StartingPointSolver`] (warm-start replay)
//!
//! # Design
//!
//! The model does not depend on any solver engine. External engines plug
//! in through [`CpSolver`]; the bundled implementations are meant for
//! small instances and for tests.
//!
//! # References
//!
//! Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

mod model;
mod search;
mod solver;
mod variables;

pub use model::{Constraint, CpModel, Objective};
pub use search::EnumerationSolver;
pub use solver::{CpSolution, CpSolver, SolverConfig, SolverStatus, StartingPointSolver};
pub use variables::{IntervalId, IntervalVar, SequenceId, SequenceVar, TimePoint, TransitionMatrix};
