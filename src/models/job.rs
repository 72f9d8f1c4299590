//! Job, operation and machine model.
//!
//! A job is an ordered chain of operations; each operation visits exactly
//! one machine of its module. Machines only index the operations they
//! process, the owning job holds the operation itself.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2.1

use serde::{Deserialize, Serialize};

use super::ids::{Delay, JobId, MachineId, OpKey, OperationId};

/// The indivisible unit of work of one job on one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// `(job, operation)` identity.
    pub key: OpKey,
    /// Processing duration (non-negative).
    pub processing: Delay,
    /// Size attribute, consumed by maintenance policies only.
    pub size: Delay,
    /// Machine this operation runs on. Fixed at creation.
    pub machine: MachineId,
    /// Nominal start time, overwritten when a solution is decoded.
    pub start_time: Delay,
}

impl Operation {
    /// End time implied by the current start time.
    #[inline]
    pub fn end_time(&self) -> Delay {
        self.start_time + self.processing
    }
}

/// A job: an ordered chain of operations.
///
/// # Precedence
/// The iteration order of `operations` is the execution order: operation
/// `k` must finish before operation `k + 1` starts. Operations are
/// appended in declaration order, which the loader guarantees to be
/// ascending [`OperationId`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier.
    pub id: JobId,
    operations: Vec<Operation>,
    /// Absolute completion deadline. `None` = unbounded.
    pub deadline: Option<Delay>,
}

impl Job {
    /// Creates an empty job.
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            operations: Vec::new(),
            deadline: None,
        }
    }

    /// Sets the absolute deadline.
    pub fn with_deadline(mut self, deadline: Delay) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Appends an operation and returns it.
    ///
    /// Callers must also register the returned key with the target
    /// machine; [`super::Flowshop::add_operation`] does both.
    pub(crate) fn add_operation(
        &mut self,
        op: OperationId,
        processing: Delay,
        size: Delay,
        machine: MachineId,
    ) -> &Operation {
        self.operations.push(Operation {
            key: OpKey { job: self.id, op },
            processing,
            size,
            machine,
            start_time: 0,
        });
        let last = self.operations.len() - 1;
        &self.operations[last]
    }

    /// Operations in precedence order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub(crate) fn operations_mut(&mut self) -> &mut [Operation] {
        &mut self.operations
    }

    /// Finds an operation by id.
    pub fn operation(&self, op: OperationId) -> Option<&Operation> {
        self.operations.iter().find(|o| o.key.op == op)
    }

    pub(crate) fn operation_mut(&mut self, op: OperationId) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|o| o.key.op == op)
    }

    /// First operation in precedence order.
    pub fn first(&self) -> Option<&Operation> {
        self.operations.first()
    }

    /// Last operation in precedence order.
    pub fn last(&self) -> Option<&Operation> {
        self.operations.last()
    }

    /// Number of operations.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Sum of processing times.
    pub fn total_processing(&self) -> Delay {
        self.operations.iter().map(|o| o.processing).sum()
    }
}

/// A machine and the operations it processes.
///
/// `operations` is in discovery order (the order the loader met them),
/// not in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Machine identifier.
    pub id: MachineId,
    /// Keys of the operations assigned to this machine.
    pub operations: Vec<OpKey>,
}

impl Machine {
    /// Creates a machine with no operations.
    pub fn new(id: MachineId) -> Self {
        Self {
            id,
            operations: Vec::new(),
        }
    }

    /// Whether more than one operation of the same job visits this machine.
    pub fn is_reentrant(&self) -> bool {
        let mut jobs: Vec<JobId> = self.operations.iter().map(|k| k.job).collect();
        let before = jobs.len();
        jobs.sort();
        jobs.dedup();
        jobs.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_operation_preserves_order() {
        let mut job = Job::new(JobId(0));
        job.add_operation(OperationId(0), 3, 0, MachineId(0));
        job.add_operation(OperationId(1), 2, 5, MachineId(1));

        assert_eq!(job.operation_count(), 2);
        assert_eq!(job.first().unwrap().key, OpKey::new(0, 0));
        assert_eq!(job.last().unwrap().key, OpKey::new(0, 1));
        assert_eq!(job.operation(OperationId(1)).unwrap().size, 5);
        assert_eq!(job.total_processing(), 5);
    }

    #[test]
    fn test_default_deadline_unbounded() {
        let job = Job::new(JobId(1));
        assert!(job.deadline.is_none());
        assert_eq!(Job::new(JobId(1)).with_deadline(40).deadline, Some(40));
    }

    #[test]
    fn test_operation_end_time() {
        let mut job = Job::new(JobId(0));
        job.add_operation(OperationId(0), 7, 0, MachineId(0));
        let op = &mut job.operations_mut()[0];
        op.start_time = 10;
        assert_eq!(op.end_time(), 17);
    }

    #[test]
    fn test_reentrant_machine() {
        let mut m = Machine::new(MachineId(1));
        m.operations.push(OpKey::new(0, 1));
        m.operations.push(OpKey::new(1, 1));
        assert!(!m.is_reentrant());
        m.operations.push(OpKey::new(0, 2));
        assert!(m.is_reentrant());
    }
}
