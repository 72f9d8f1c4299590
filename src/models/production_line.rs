//! Production line: an ordered chain of flow-shop modules.
//!
//! Consecutive modules are linked per job by transfer constraints that
//! relate the end of the job's last operation upstream to the start of
//! its first operation downstream.

use std::collections::BTreeMap;

use super::flowshop::Flowshop;
use super::ids::{Delay, JobId, ModuleId, OpKey, OperationId};
use crate::error::{Error, Result};

/// Per-job values keyed by `(module_from, module_to)`.
pub type TransferConstraints = BTreeMap<(ModuleId, ModuleId), BTreeMap<JobId, Delay>>;

/// Nested start times: `module -> job -> operation -> start`, keyed by
/// the decimal string of each id.
pub type TimingTable = BTreeMap<String, BTreeMap<String, BTreeMap<String, Delay>>>;

/// An ordered sequence of modules plus transfer constraints.
#[derive(Debug, Clone)]
pub struct ProductionLine {
    modules: BTreeMap<ModuleId, Flowshop>,
    /// Extra setup between consecutive modules, per job.
    pub setup: TransferConstraints,
    /// Due-date offset between consecutive modules, per job.
    pub due: TransferConstraints,
}

impl ProductionLine {
    /// Builds a line.
    ///
    /// # Errors
    /// [`Error::EmptyProductionLine`] if `modules` is empty. Transfer
    /// declarations are validated by the loader, not here.
    pub fn new(
        modules: BTreeMap<ModuleId, Flowshop>,
        setup: TransferConstraints,
        due: TransferConstraints,
    ) -> Result<Self> {
        if modules.is_empty() {
            return Err(Error::EmptyProductionLine);
        }
        Ok(Self {
            modules,
            setup,
            due,
        })
    }

    /// Wraps a single module in a line without transfers.
    pub fn single(module: Flowshop) -> Self {
        let mut modules = BTreeMap::new();
        modules.insert(module.id, module);
        Self {
            modules,
            setup: TransferConstraints::new(),
            due: TransferConstraints::new(),
        }
    }

    /// Modules in ascending id order.
    pub fn modules(&self) -> &BTreeMap<ModuleId, Flowshop> {
        &self.modules
    }

    /// Finds a module by id.
    pub fn module(&self, id: ModuleId) -> Option<&Flowshop> {
        self.modules.get(&id)
    }

    /// Id of the last module (the maximum id).
    pub fn last_module_id(&self) -> ModuleId {
        // non-empty by construction
        self.modules.keys().next_back().copied().unwrap_or_default()
    }

    /// The last module, anchor of the makespan objective.
    pub fn last_module(&self) -> &Flowshop {
        let id = self.last_module_id();
        &self.modules[&id]
    }

    /// Transfer setup of `job` between two modules. Zero when undeclared.
    pub fn transfer_setup(&self, from: ModuleId, to: ModuleId, job: JobId) -> Delay {
        self.setup
            .get(&(from, to))
            .and_then(|jobs| jobs.get(&job))
            .copied()
            .unwrap_or(0)
    }

    /// Transfer due offset of `job` between two modules. `None` = unbounded.
    pub fn transfer_due(&self, from: ModuleId, to: ModuleId, job: JobId) -> Option<Delay> {
        self.due.get(&(from, to)).and_then(|jobs| jobs.get(&job)).copied()
    }

    /// Total number of operations across modules.
    pub fn operation_count(&self) -> usize {
        self.modules.values().map(|m| m.operation_count()).sum()
    }

    /// Overwrites operation start times from a timing table.
    ///
    /// Keys are parsed as unsigned integers; every referenced module, job
    /// and operation must exist.
    pub fn apply_start_times(&mut self, timing: &TimingTable) -> Result<usize> {
        let mut applied = 0;
        for (module_key, jobs) in timing {
            let module_id = ModuleId(parse_key(module_key)?);
            let module = self
                .modules
                .get_mut(&module_id)
                .ok_or(Error::UnknownModule(module_id))?;
            for (job_key, ops) in jobs {
                let job = JobId(parse_key(job_key)?);
                if module.job(job).is_none() {
                    return Err(Error::UnknownJob {
                        module: module_id,
                        job,
                    });
                }
                for (op_key, &start) in ops {
                    let op = OperationId(parse_key(op_key)?);
                    if !module.set_start_time(OpKey { job, op }, start) {
                        return Err(Error::UnknownOperation {
                            module: module_id,
                            job,
                            op,
                        });
                    }
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }

    /// Current start times as a timing table.
    pub fn timing_table(&self) -> TimingTable {
        let mut timing = TimingTable::new();
        for (module_id, module) in &self.modules {
            let jobs = timing.entry(module_id.to_string()).or_default();
            for op in module.operations() {
                jobs.entry(op.key.job.to_string())
                    .or_default()
                    .insert(op.key.op.to_string(), op.start_time);
            }
        }
        timing
    }
}

/// Parses a timing-table key as an unsigned integer.
pub(crate) fn parse_key(key: &str) -> Result<u32> {
    key.trim()
        .parse::<u32>()
        .map_err(|_| Error::InvalidKey(key.to_string()))
}
