//! Production-line domain models.
//!
//! Provides the data types for multi-module flow-shop problems: machines,
//! jobs and operations of one module, the module itself with its setup
//! and due tables, and the production line chaining modules together.
//!
//! # Ownership
//!
//! | Entity | Owned by | Indexed by |
//! |--------|----------|-----------|
//! | Operation | Job | Machine (by [`OpKey`]) |
//! | Job, Machine | Flowshop | id |
//! | Flowshop | ProductionLine | [`ModuleId`] |

mod flowshop;
mod ids;
mod job;
mod maintenance;
mod production_line;

pub use flowshop::{Flowshop, PairTable};
pub use ids::{Delay, JobId, MachineId, ModuleId, OpKey, OperationId};
pub use job::{Job, Machine, Operation};
pub use maintenance::MaintenancePolicy;
pub use production_line::{ProductionLine, TimingTable, TransferConstraints};

pub(crate) use production_line::parse_key;
