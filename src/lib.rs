//! Production-line scheduling models for multi-module flow shops.
//!
//! Provides the domain model of a production line (modules of machines,
//! jobs and operations chained by transfer constraints), its encoding as
//! a solver-agnostic constraint program, and the application, verification
//! and reporting of solutions.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Flowshop`, `Job`, `Operation`,
//!   `Machine`, `ProductionLine`, `MaintenancePolicy`
//! - **`loader`**: JSON instance documents to production lines
//! - **`validation`**: Structural checks of instance documents
//! - **`encoder`**: Production line to CP model (constraints C1-C7, CT1-CT2)
//! - **`cp`**: Interval/sequence variables, constraints, `CpSolver` trait
//! - **`verify`**: Solver-independent feasibility check of start times
//! - **`solution`**: Warm starts, result records, CBOR persistence
//! - **`runner`**: Load-encode-solve-report pipeline
//! - **`generator`**: Duplex printer and random test instances
//! - **`config`**: Scale and maintenance defaults, TOML run settings
//!
//! # Architecture
//!
//! The crate carries no dependency on any solver engine. Engines plug in
//! through [`cp::CpSolver`]; the bundled [`cp::EnumerationSolver`] is an
//! exhaustive search meant for small instances and tests.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

pub mod config;
pub mod cp;
pub mod encoder;
pub mod error;
pub mod generator;
pub mod loader;
pub mod models;
pub mod runner;
pub mod solution;
pub mod validation;
pub mod verify;

pub use error::{Error, Result};
