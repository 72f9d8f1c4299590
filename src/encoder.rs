//! CP encoding of a production line.
//!
//! Translates every module of a [`ProductionLine`] into interval and
//! sequence variables and emits the flow-shop constraints:
//!
//! | Tag | Constraint |
//! |-----|-----------|
//! | C1 | consecutive operations of a job: `end(prev) <= start(next)` |
//! | C2/C3 | per machine: no overlap, plus direct sequence-dependent setups |
//! | C4 | declared independent setups: `end(a) + setup <= start(b)` |
//! | C5 | declared independent due dates: `start(b) + due >= start(a)` |
//! | C6 | fixed output order: `start(last(j)) <= start(last(j+1))` |
//! | C7 | no overtaking between consecutive jobs on shared machines |
//! | CT1 | transfer setup: `end(last upstream) + s <= start(first downstream)` |
//! | CT2 | transfer due: `end(last upstream) + d >= start(first downstream)` |
//!
//! The objective minimizes the end of the last operation of the last
//! job in the last module.
//!
//! # Reference
//! Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

use std::collections::BTreeMap;

use crate::cp::{
    CpModel, IntervalId, IntervalVar, Objective, SequenceId, SequenceVar, TimePoint,
    TransitionMatrix,
};
use crate::models::{Flowshop, JobId, MachineId, ModuleId, OpKey, ProductionLine};

/// Number of constraints emitted per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingStats {
    pub intervals: usize,
    pub sequences: usize,
    pub job_precedences: usize,
    pub no_overlaps: usize,
    pub independent_setups: usize,
    pub due_dates: usize,
    pub output_orders: usize,
    pub no_overtaking: usize,
    pub transfer_setups: usize,
    pub transfer_dues: usize,
}

/// The CP model of a production line plus the variable lookup tables.
#[derive(Debug, Clone)]
pub struct EncodedLine {
    model: CpModel,
    intervals: BTreeMap<(ModuleId, OpKey), IntervalId>,
    sequences: BTreeMap<(ModuleId, MachineId), SequenceId>,
    stats: EncodingStats,
    last_module_jobs: usize,
}

impl EncodedLine {
    /// The encoded model.
    pub fn model(&self) -> &CpModel {
        &self.model
    }

    /// Mutable access, used to register warm starts.
    pub fn model_mut(&mut self) -> &mut CpModel {
        &mut self.model
    }

    /// Interval variable of an operation.
    pub fn interval(&self, module: ModuleId, key: OpKey) -> Option<IntervalId> {
        self.intervals.get(&(module, key)).copied()
    }

    /// Sequence variable of a machine.
    pub fn sequence(&self, module: ModuleId, machine: MachineId) -> Option<SequenceId> {
        self.sequences.get(&(module, machine)).copied()
    }

    /// All operations and their interval variables, module by module in
    /// job-major order.
    pub fn operations(&self) -> impl Iterator<Item = (ModuleId, OpKey, IntervalId)> + '_ {
        self.intervals.iter().map(|(&(m, k), &id)| (m, k, id))
    }

    /// Whether `module` has any encoded operation.
    pub fn has_module(&self, module: ModuleId) -> bool {
        self.intervals
            .range((module, OpKey::new(0, 0))..)
            .next()
            .is_some_and(|(&(m, _), _)| m == module)
    }

    /// Emitted constraint counts.
    pub fn stats(&self) -> EncodingStats {
        self.stats
    }

    /// Number of jobs in the last module.
    pub fn last_module_jobs(&self) -> usize {
        self.last_module_jobs
    }
}

/// Builds a [`CpModel`] from a production line.
///
/// # Example
/// ```no_run
/// use u_flowline::encoder::LineEncoder;
/// use u_flowline::cp::{EnumerationSolver, CpSolver, SolverConfig};
/// # fn line() -> u_flowline::models::ProductionLine { unimplemented!() }
///
/// let line = line();
/// let encoded = LineEncoder::new(&line).encode();
/// let solution = EnumerationSolver::new().solve(encoded.model(), &SolverConfig::default());
/// ```
pub struct LineEncoder<'a> {
    line: &'a ProductionLine,
}

impl<'a> LineEncoder<'a> {
    /// Creates an encoder over a line.
    pub fn new(line: &'a ProductionLine) -> Self {
        Self { line }
    }

    /// Encodes the whole line.
    pub fn encode(&self) -> EncodedLine {
        let mut encoded = EncodedLine {
            model: CpModel::new("production-line"),
            intervals: BTreeMap::new(),
            sequences: BTreeMap::new(),
            stats: EncodingStats::default(),
            last_module_jobs: self.line.last_module().jobs().len(),
        };

        for (&module_id, fs) in self.line.modules() {
            self.encode_module(&mut encoded, module_id, fs);
        }
        self.encode_transfers(&mut encoded);
        self.encode_objective(&mut encoded);

        encoded.stats.intervals = encoded.model.interval_count();
        encoded.stats.sequences = encoded.model.sequences().len();
        tracing::debug!(stats = ?encoded.stats, "production line encoded");
        encoded
    }

    fn encode_module(&self, encoded: &mut EncodedLine, module_id: ModuleId, fs: &Flowshop) {
        let model = &mut encoded.model;
        let stats = &mut encoded.stats;
        let intervals = &mut encoded.intervals;

        for job in fs.jobs() {
            for op in job.operations() {
                let name = format!("O{module_id}_{}_{}", op.key.job, op.key.op);
                let id = model.add_interval(IntervalVar::new(name, op.processing));
                intervals.insert((module_id, op.key), id);
            }
        }
        let var = |key: OpKey| intervals.get(&(module_id, key)).copied();

        // C2/C3: machine exclusivity with sequence-dependent setups
        for machine in fs.machines() {
            let members: Vec<IntervalId> = machine.operations.iter().filter_map(|&k| var(k)).collect();
            let types: Vec<usize> = (0..members.len()).collect();
            let ops = &machine.operations;
            let transitions =
                TransitionMatrix::from_fn(ops.len(), |a, b| fs.query(ops[a], ops[b]));

            let seq = model.add_sequence(SequenceVar::new(
                format!("M{module_id}_{}", machine.id),
                members,
                types,
            ));
            encoded.sequences.insert((module_id, machine.id), seq);
            model.add_no_overlap(seq, None);
            model.add_no_overlap(seq, Some(transitions));
            stats.no_overlaps += 2;
        }

        // C1: operations of a job in order
        for job in fs.jobs() {
            for pair in job.operations().windows(2) {
                if let (Some(prev), Some(next)) = (var(pair[0].key), var(pair[1].key)) {
                    model.add_precedence(TimePoint::End(prev), TimePoint::Start(next), 0);
                    stats.job_precedences += 1;
                }
            }
        }

        // C4: sequence-independent setups
        for &(from, to) in fs.setup_independent().keys() {
            let (Some(a), Some(b)) = (var(from), var(to)) else {
                tracing::warn!(%module_id, %from, %to, "independent setup names unknown operation");
                continue;
            };
            model.add_precedence(TimePoint::End(a), TimePoint::Start(b), fs.query(from, to));
            stats.independent_setups += 1;
        }

        // C5: relative due dates, start(to) + value >= start(from)
        for (&(from, to), &value) in fs.due_independent() {
            let (Some(a), Some(b)) = (var(from), var(to)) else {
                tracing::warn!(%module_id, %from, %to, "due date names unknown operation");
                continue;
            };
            model.add_deadline(TimePoint::Start(b), TimePoint::Start(a), value);
            stats.due_dates += 1;
        }

        for pair in fs.jobs().windows(2) {
            let (ops_prev, ops_next) = (pair[0].operations(), pair[1].operations());

            // C6: fixed output order
            if let (Some(prev_last), Some(next_last)) = (ops_prev.last(), ops_next.last()) {
                if let (Some(a), Some(b)) = (var(prev_last.key), var(next_last.key)) {
                    model.add_precedence(TimePoint::Start(a), TimePoint::Start(b), 0);
                    stats.output_orders += 1;
                }
            }

            // C7: no overtaking
            for prev in ops_prev.windows(2) {
                for next in ops_next.windows(2) {
                    if prev[0].machine != next[0].machine || prev[1].machine != next[1].machine {
                        continue;
                    }
                    let ids = (
                        var(prev[0].key),
                        var(next[0].key),
                        var(prev[1].key),
                        var(next[1].key),
                    );
                    if let (Some(p), Some(n), Some(pn), Some(nn)) = ids {
                        model.add_if_then(
                            (TimePoint::Start(p), TimePoint::Start(n)),
                            (TimePoint::Start(pn), TimePoint::Start(nn)),
                        );
                        stats.no_overtaking += 1;
                    }
                }
            }
        }
    }

    /// Boundary operations of `job` between two modules: last upstream,
    /// first downstream.
    fn boundary(
        &self,
        encoded: &EncodedLine,
        from: ModuleId,
        to: ModuleId,
        job: JobId,
    ) -> Option<(IntervalId, IntervalId)> {
        let last = self.line.module(from)?.job(job)?.last()?.key;
        let first = self.line.module(to)?.job(job)?.first()?.key;
        Some((encoded.interval(from, last)?, encoded.interval(to, first)?))
    }

    fn encode_transfers(&self, encoded: &mut EncodedLine) {
        // CT1: transfer setup times
        for (&(from, to), jobs) in &self.line.setup {
            for (&job, &value) in jobs {
                let Some((last, first)) = self.boundary(encoded, from, to, job) else {
                    tracing::warn!(%from, %to, %job, "transfer setup names unknown job");
                    continue;
                };
                encoded
                    .model
                    .add_precedence(TimePoint::End(last), TimePoint::Start(first), value);
                encoded.stats.transfer_setups += 1;
            }
        }

        // CT2: transfer due dates
        for (&(from, to), jobs) in &self.line.due {
            for (&job, &value) in jobs {
                let Some((last, first)) = self.boundary(encoded, from, to, job) else {
                    tracing::warn!(%from, %to, %job, "transfer due date names unknown job");
                    continue;
                };
                encoded
                    .model
                    .add_deadline(TimePoint::End(last), TimePoint::Start(first), value);
                encoded.stats.transfer_dues += 1;
            }
        }
    }

    fn encode_objective(&self, encoded: &mut EncodedLine) {
        let module = self.line.last_module();
        let last = module
            .last_job()
            .and_then(|job| job.last())
            .and_then(|op| encoded.interval(module.id, op.key));
        if let Some(id) = last {
            encoded.model.set_objective(Objective::MinimizeEnd(id));
        }
    }
}
