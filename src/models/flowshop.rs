//! Flow-shop module: one production stage.
//!
//! A module owns its machines and jobs plus the pairwise setup and due
//! tables between operations. Setup tables come in two flavours:
//!
//! - **dense** ([`PairTable`]): a declared default fill plus explicit
//!   entries, consulted for every ordered pair of operations;
//! - **independent** (sparse map): explicitly declared pairs that also
//!   impose a sequence-independent constraint.
//!
//! Due tables mirror this layout. An unset due entry means "no bound",
//! never zero.
//!
//! # Reference
//! Allahverdi et al. (2008), "A survey of scheduling problems with
//! setup times or costs"

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::ids::{Delay, JobId, MachineId, ModuleId, OpKey, OperationId};
use super::job::{Job, Machine, Operation};
use super::maintenance::MaintenancePolicy;
use crate::config::ShopConfig;

/// Sparse stand-in for a dense operation-pair matrix.
///
/// Holds explicit `(from, to) -> value` entries and an optional fill
/// value that every unset pair takes. Without a fill, unset pairs have
/// no value at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairTable {
    /// Value of every pair without an explicit entry.
    pub fill: Option<Delay>,
    entries: HashMap<(OpKey, OpKey), Delay>,
}

impl PairTable {
    /// Creates an empty table with no fill.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fill value.
    pub fn with_fill(mut self, fill: Delay) -> Self {
        self.fill = Some(fill);
        self
    }

    /// Sets an explicit entry.
    pub fn set(&mut self, from: OpKey, to: OpKey, value: Delay) {
        self.entries.insert((from, to), value);
    }

    /// Explicit entry, else the fill, else `None`.
    pub fn get(&self, from: OpKey, to: OpKey) -> Option<Delay> {
        self.entries.get(&(from, to)).copied().or(self.fill)
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has neither entries nor a fill.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.fill.is_none()
    }
}

/// One flow-shop module of a production line.
///
/// # Invariants
/// - Jobs are kept in ascending [`JobId`] order; this order is the
///   required output order of the module.
/// - Every operation is owned by exactly one job and indexed by exactly
///   one machine; [`Flowshop::add_operation`] is the only way to create one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flowshop {
    /// Module identifier.
    pub id: ModuleId,
    /// Declared operation count per job.
    pub ops_per_job: usize,
    /// Declared job count.
    pub job_count: usize,
    machines: Vec<Machine>,
    jobs: Vec<Job>,
    /// Dense sequence-dependent setup times.
    pub setup: PairTable,
    setup_independent: BTreeMap<(OpKey, OpKey), Delay>,
    /// Dense relative due dates, keyed as declared: `(j1,op1) -> (j2,op2)`.
    pub due: PairTable,
    due_independent: BTreeMap<(OpKey, OpKey), Delay>,
    /// Maintenance data (scaled).
    pub maintenance: MaintenancePolicy,
}

impl Flowshop {
    /// Creates a module with `machines` empty machines and no jobs.
    pub fn new(
        id: ModuleId,
        machines: usize,
        jobs: usize,
        ops_per_job: usize,
        config: &ShopConfig,
    ) -> Self {
        Self {
            id,
            ops_per_job,
            job_count: jobs,
            machines: (0..machines as u32).map(|m| Machine::new(MachineId(m))).collect(),
            jobs: Vec::with_capacity(jobs),
            setup: PairTable::new(),
            setup_independent: BTreeMap::new(),
            due: PairTable::new(),
            due_independent: BTreeMap::new(),
            maintenance: MaintenancePolicy::from_config(config),
        }
    }

    /// Registers a job, keeping jobs ordered by id.
    ///
    /// Re-registering an existing id replaces nothing and returns the
    /// existing job.
    pub fn add_job(&mut self, job: Job) -> &mut Job {
        let pos = match self.jobs.binary_search_by_key(&job.id, |j| j.id) {
            Ok(pos) => pos,
            Err(pos) => {
                self.jobs.insert(pos, job);
                pos
            }
        };
        &mut self.jobs[pos]
    }

    /// Creates an operation of `job` on `machine`.
    ///
    /// The operation is appended to the job's precedence chain and to the
    /// machine's operation list. Returns `None` when the job is not
    /// registered or the machine does not exist.
    pub fn add_operation(
        &mut self,
        job: JobId,
        op: OperationId,
        processing: Delay,
        size: Delay,
        machine: MachineId,
    ) -> Option<&Operation> {
        let job_pos = self.jobs.binary_search_by_key(&job, |j| j.id).ok()?;
        self.machines
            .get_mut(machine.index())?
            .operations
            .push(OpKey { job, op });
        Some(self.jobs[job_pos].add_operation(op, processing, size, machine))
    }

    /// Jobs in ascending id order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Finds a job by id.
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs
            .binary_search_by_key(&id, |j| j.id)
            .ok()
            .map(|pos| &self.jobs[pos])
    }

    fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        let pos = self.jobs.binary_search_by_key(&id, |j| j.id).ok()?;
        Some(&mut self.jobs[pos])
    }

    /// Machines in id order.
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Finds a machine by id.
    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.get(id.index())
    }

    /// Number of machines.
    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    /// Finds an operation by key.
    pub fn operation(&self, key: OpKey) -> Option<&Operation> {
        self.job(key.job)?.operation(key.op)
    }

    /// All operations, job by job in precedence order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.jobs.iter().flat_map(|j| j.operations().iter())
    }

    /// Total number of operations.
    pub fn operation_count(&self) -> usize {
        self.jobs.iter().map(|j| j.operation_count()).sum()
    }

    /// Last job in output order.
    pub fn last_job(&self) -> Option<&Job> {
        self.jobs.last()
    }

    /// Declares a sequence-independent setup between two operations.
    ///
    /// The pair also takes part in [`Flowshop::query`].
    pub fn add_setup_independent(&mut self, from: OpKey, to: OpKey, value: Delay) {
        self.setup_independent.insert((from, to), value);
    }

    /// Declared sequence-independent setups.
    pub fn setup_independent(&self) -> &BTreeMap<(OpKey, OpKey), Delay> {
        &self.setup_independent
    }

    /// Declares an independent relative due date.
    ///
    /// A value `d` for `(from, to)` imposes
    /// `start(to) + d >= start(from)`: `from` must start at most `d`
    /// time units after `to` starts. The order is the opposite of the
    /// natural reading.
    pub fn add_due_independent(&mut self, from: OpKey, to: OpKey, value: Delay) {
        self.due_independent.insert((from, to), value);
    }

    /// Declared independent relative due dates.
    pub fn due_independent(&self) -> &BTreeMap<(OpKey, OpKey), Delay> {
        &self.due_independent
    }

    /// Independent due date of `(from, to)`, if declared.
    pub fn due_date_independent(&self, from: OpKey, to: OpKey) -> Option<Delay> {
        self.due_independent.get(&(from, to)).copied()
    }

    /// Setup time required when `to` follows `from`.
    ///
    /// The maximum of the dense and independent contributions; zero when
    /// neither is set.
    pub fn query(&self, from: OpKey, to: OpKey) -> Delay {
        let dense = self.setup.get(from, to).unwrap_or(0);
        let independent = self
            .setup_independent
            .get(&(from, to))
            .copied()
            .unwrap_or(0);
        dense.max(independent)
    }

    /// Tightest due bound of `(from, to)`. `None` = unbounded.
    ///
    /// Both due tables are keyed as declared, `from = (j1,op1)` and
    /// `to = (j2,op2)`, so the bound reads `start(from) <= start(to) + due`.
    pub fn due_bound(&self, from: OpKey, to: OpKey) -> Option<Delay> {
        match (self.due.get(from, to), self.due_date_independent(from, to)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Current start time of an operation.
    pub fn start_time(&self, key: OpKey) -> Option<Delay> {
        self.operation(key).map(|o| o.start_time)
    }

    /// Overwrites the start time of an operation. Returns `false` when the
    /// operation does not exist.
    pub fn set_start_time(&mut self, key: OpKey, start: Delay) -> bool {
        match self.job_mut(key.job).and_then(|j| j.operation_mut(key.op)) {
            Some(op) => {
                op.start_time = start;
                true
            }
            None => false,
        }
    }

    /// Resets every start time to zero.
    pub fn clear_start_times(&mut self) {
        for job in &mut self.jobs {
            for op in job.operations_mut() {
                op.start_time = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_job_shop() -> Flowshop {
        let mut fs = Flowshop::new(ModuleId(0), 2, 2, 2, &ShopConfig::default());
        for j in 0..2 {
            fs.add_job(Job::new(JobId(j)));
            fs.add_operation(JobId(j), OperationId(0), 3, 1, MachineId(0)).unwrap();
            fs.add_operation(JobId(j), OperationId(1), 2, 1, MachineId(1)).unwrap();
        }
        fs
    }

    #[test]
    fn test_add_operation_registers_job_and_machine() {
        let fs = two_job_shop();
        assert_eq!(fs.operation_count(), 4);
        assert_eq!(
            fs.machine(MachineId(0)).unwrap().operations,
            vec![OpKey::new(0, 0), OpKey::new(1, 0)]
        );
        assert_eq!(fs.operation(OpKey::new(1, 1)).unwrap().machine, MachineId(1));
    }

    #[test]
    fn test_add_operation_unknown_targets() {
        let mut fs = two_job_shop();
        assert!(fs
            .add_operation(JobId(9), OperationId(0), 1, 0, MachineId(0))
            .is_none());
        assert!(fs
            .add_operation(JobId(0), OperationId(2), 1, 0, MachineId(5))
            .is_none());
        assert_eq!(fs.operation_count(), 4);
    }

    #[test]
    fn test_jobs_sorted_by_id() {
        let mut fs = Flowshop::new(ModuleId(0), 1, 3, 1, &ShopConfig::default());
        fs.add_job(Job::new(JobId(2)));
        fs.add_job(Job::new(JobId(0)));
        fs.add_job(Job::new(JobId(1)));
        let ids: Vec<u32> = fs.jobs().iter().map(|j| j.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(fs.last_job().unwrap().id, JobId(2));
    }

    #[test]
    fn test_query_defaults_to_zero() {
        let fs = two_job_shop();
        assert_eq!(fs.query(OpKey::new(0, 0), OpKey::new(1, 0)), 0);
    }

    #[test]
    fn test_query_takes_binding_value() {
        let mut fs = two_job_shop();
        let (a, b) = (OpKey::new(0, 0), OpKey::new(1, 0));
        fs.setup.set(a, b, 4);
        assert_eq!(fs.query(a, b), 4);
        fs.add_setup_independent(a, b, 2);
        assert_eq!(fs.query(a, b), 4);
        fs.add_setup_independent(a, b, 9);
        assert_eq!(fs.query(a, b), 9);
        // direction matters
        assert_eq!(fs.query(b, a), 0);
    }

    #[test]
    fn test_query_uses_fill() {
        let mut fs = two_job_shop();
        fs.setup = PairTable::new().with_fill(5);
        assert_eq!(fs.query(OpKey::new(0, 1), OpKey::new(1, 1)), 5);
    }

    #[test]
    fn test_due_unset_is_unbounded() {
        let mut fs = two_job_shop();
        let (a, b) = (OpKey::new(0, 1), OpKey::new(0, 0));
        assert_eq!(fs.due_bound(a, b), None);
        fs.add_due_independent(a, b, 12);
        assert_eq!(fs.due_date_independent(a, b), Some(12));
        fs.due.set(a, b, 8);
        assert_eq!(fs.due_bound(a, b), Some(8));
        assert_eq!(fs.due_date_independent(b, a), None);
    }

    #[test]
    fn test_start_times() {
        let mut fs = two_job_shop();
        assert!(fs.set_start_time(OpKey::new(1, 1), 42));
        assert_eq!(fs.start_time(OpKey::new(1, 1)), Some(42));
        assert!(!fs.set_start_time(OpKey::new(4, 0), 1));
        fs.clear_start_times();
        assert_eq!(fs.start_time(OpKey::new(1, 1)), Some(0));
    }

    proptest! {
        #[test]
        fn prop_query_is_max_of_tables(
            dense in proptest::option::of(0i64..1000),
            sparse in proptest::option::of(0i64..1000),
        ) {
            let mut fs = two_job_shop();
            let (a, b) = (OpKey::new(0, 1), OpKey::new(1, 1));
            if let Some(v) = dense {
                fs.setup.set(a, b, v);
            }
            if let Some(v) = sparse {
                fs.add_setup_independent(a, b, v);
            }
            let expected = dense.unwrap_or(0).max(sparse.unwrap_or(0));
            prop_assert_eq!(fs.query(a, b), expected);
        }
    }
}
