//! Exhaustive reference solver for small models.
//!
//! # Algorithm
//!
//! 1. Translate precedence and deadline constraints into difference
//!    constraints `start[v] >= start[u] + w` (edges of a temporal graph).
//! 2. Branch on machine sequences: one sequence at a time, append an
//!    unplaced member, adding no-overlap edges from every member already
//!    placed and the transition edge from its direct predecessor.
//! 3. Evaluate each node with a longest-path pass (Bellman-Ford). A
//!    positive cycle means the partial ordering is infeasible. Adding
//!    edges never decreases path lengths, so the objective at a node is a
//!    lower bound for its whole subtree.
//! 4. At leaves, check conditional orderings on the earliest start times.
//!    This is exact when every ordering a condition reads is fixed by the
//!    machine sequences (positive sizes on a shared sequence). Otherwise
//!    a rejected leaf may hide a feasible later assignment, and the
//!    result is reported as `Feasible`/`Unknown` instead of
//!    `Optimal`/`Infeasible`.
//!
//! # Complexity
//! O(Π n_m! · V · E) in the worst case, n_m = members of sequence m.
//! Intended for small instances and as a test oracle.
//!
//! # Reference
//! Brucker (2007), "Scheduling Algorithms", Ch. 6.4 (disjunctive graph
//! branch and bound)

use std::time::Instant;

use super::model::{Constraint, CpModel};
use super::solver::{CpSolution, CpSolver, SolverConfig, SolverStatus};
use super::variables::{TimePoint, TransitionMatrix};
use crate::models::Delay;
use crate::verify::verify;

/// `start[to] >= start[from] + weight`.
type Edge = (usize, usize, Delay);

/// Branch-and-bound over machine sequences.
///
/// Seeds its incumbent from the model's starting point when that is
/// complete and feasible, and only replaces it by strictly better
/// solutions.
///
/// Conditional orderings over zero-size intervals, or over intervals on
/// different sequences, are only checked on earliest start times; once
/// such a check rejects a leaf, optimality and infeasibility are no
/// longer claimed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerationSolver;

impl EnumerationSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for EnumerationSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        if model.validate().is_err() {
            return CpSolution::empty(SolverStatus::ModelInvalid);
        }
        let started = Instant::now();

        let mut search = Search::new(model, started + config.time_limit);
        let root = longest_path(model.interval_count(), &search.edges);
        let Some(root) = root else {
            let mut solution = CpSolution::empty(SolverStatus::Infeasible);
            solution.solve_time = started.elapsed();
            return solution;
        };
        let lower_bound = model.objective_value(&root);

        if let Some(starts) = model.starting_starts() {
            if verify(model, &starts).is_empty() {
                let value = model.objective_value(&starts);
                tracing::debug!(objective = value, "seeded incumbent from starting point");
                search.best = Some((value, starts));
            }
        }

        search.branch(0);
        tracing::debug!(
            nodes = search.nodes,
            timed_out = search.timed_out,
            best = ?search.best.as_ref().map(|b| b.0),
            "enumeration finished"
        );

        let solve_time = started.elapsed();
        let exhaustive = !search.timed_out && !search.inexact;
        match search.best {
            Some((objective, starts)) => CpSolution {
                status: if exhaustive {
                    SolverStatus::Optimal
                } else {
                    SolverStatus::Feasible
                },
                objective: Some(objective),
                bound: Some(if exhaustive { objective } else { lower_bound }),
                starts,
                solve_time,
                timed_out: search.timed_out,
            },
            None => CpSolution {
                status: if exhaustive {
                    SolverStatus::Infeasible
                } else {
                    SolverStatus::Unknown
                },
                objective: None,
                bound: (!exhaustive).then_some(lower_bound),
                starts: Vec::new(),
                solve_time,
                timed_out: search.timed_out,
            },
        }
    }
}

/// One sequence to branch on, with its transitions merged across all
/// no-overlap constraints that mention it.
struct Branching {
    members: Vec<usize>,
    types: Vec<usize>,
    transitions: Option<TransitionMatrix>,
}

struct Search<'a> {
    model: &'a CpModel,
    sizes: Vec<Delay>,
    edges: Vec<Edge>,
    sequences: Vec<Branching>,
    deadline: Instant,
    best: Option<(Delay, Vec<Delay>)>,
    timed_out: bool,
    /// Some conditional ordering is not fixed by the sequences.
    loose_conditions: bool,
    /// A leaf was rejected by a loose conditional ordering.
    inexact: bool,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn new(model: &'a CpModel, deadline: Instant) -> Self {
        let sizes: Vec<Delay> = model.intervals().iter().map(|v| v.size).collect();
        let mut edges = Vec::new();
        let mut sequences: Vec<Option<Branching>> = model.sequences().iter().map(|_| None).collect();
        let mut loose_conditions = false;

        for constraint in model.constraints() {
            match constraint {
                Constraint::Precedence {
                    before,
                    after,
                    delay,
                } => edges.push(point_edge(*before, *after, *delay, &sizes)),
                Constraint::Deadline {
                    anchor,
                    bounded,
                    offset,
                } => edges.push(point_edge(*bounded, *anchor, -offset, &sizes)),
                Constraint::NoOverlap {
                    sequence,
                    transitions,
                } => {
                    let seq = &model.sequences()[sequence.0];
                    let entry = sequences[sequence.0].get_or_insert_with(|| Branching {
                        members: seq.intervals.iter().map(|id| id.0).collect(),
                        types: seq.types.clone(),
                        transitions: None,
                    });
                    if let Some(tm) = transitions {
                        entry.transitions = Some(match &entry.transitions {
                            Some(current) => current.max_with(tm),
                            None => tm.clone(),
                        });
                    }
                }
                Constraint::IfThen {
                    if_before,
                    then_before,
                } => {
                    loose_conditions |= !order_is_fixed(model, &sizes, *if_before)
                        || !order_is_fixed(model, &sizes, *then_before);
                }
            }
        }

        Self {
            model,
            sizes,
            edges,
            sequences: sequences.into_iter().flatten().filter(|b| b.members.len() > 1).collect(),
            deadline,
            best: None,
            timed_out: false,
            loose_conditions,
            inexact: false,
            nodes: 0,
        }
    }

    fn out_of_time(&mut self) -> bool {
        if !self.timed_out && Instant::now() >= self.deadline {
            self.timed_out = true;
        }
        self.timed_out
    }

    fn improves(&self, value: Delay) -> bool {
        self.best.as_ref().map_or(true, |(best, _)| value < *best)
    }

    /// Branches on sequence `index` and everything after it.
    fn branch(&mut self, index: usize) {
        if index == self.sequences.len() {
            self.leaf();
            return;
        }
        let count = self.sequences[index].members.len();
        let mut order = Vec::with_capacity(count);
        self.extend(index, &mut order);
    }

    /// Extends the partial order of sequence `index` by one member.
    fn extend(&mut self, index: usize, order: &mut Vec<usize>) {
        let count = self.sequences[index].members.len();
        if order.len() == count {
            self.branch(index + 1);
            return;
        }

        for candidate in 0..count {
            if self.out_of_time() {
                return;
            }
            if order.contains(&candidate) {
                continue;
            }
            self.nodes += 1;

            let mark = self.edges.len();
            self.push_sequence_edges(index, order, candidate);
            order.push(candidate);

            if let Some(starts) = longest_path(self.sizes.len(), &self.edges) {
                if self.improves(self.model.objective_value(&starts)) {
                    self.extend(index, order);
                }
            }

            order.pop();
            self.edges.truncate(mark);
        }
    }

    fn push_sequence_edges(&mut self, index: usize, order: &[usize], candidate: usize) {
        let seq = &self.sequences[index];
        let to = seq.members[candidate];
        for &placed in order {
            let from = seq.members[placed];
            self.edges.push((from, to, self.sizes[from]));
        }
        if let (Some(&last), Some(tm)) = (order.last(), &seq.transitions) {
            let from = seq.members[last];
            let gap = tm.get(seq.types[last], seq.types[candidate]);
            self.edges.push((from, to, self.sizes[from] + gap));
        }
    }

    fn leaf(&mut self) {
        let Some(starts) = longest_path(self.sizes.len(), &self.edges) else {
            return;
        };
        let value = self.model.objective_value(&starts);
        if !self.improves(value) {
            return;
        }
        if verify(self.model, &starts).is_empty() {
            tracing::debug!(objective = value, nodes = self.nodes, "new incumbent");
            self.best = Some((value, starts));
        } else if self.loose_conditions {
            self.inexact = true;
        }
    }
}

/// Whether the machine sequences alone decide `pair.0 < pair.1`: both
/// points of the same kind on distinct positive-size intervals sharing a
/// sequence.
fn order_is_fixed(model: &CpModel, sizes: &[Delay], pair: (TimePoint, TimePoint)) -> bool {
    let (a, b) = (pair.0.interval(), pair.1.interval());
    let same_kind = matches!(
        pair,
        (TimePoint::Start(_), TimePoint::Start(_)) | (TimePoint::End(_), TimePoint::End(_))
    );
    same_kind
        && a != b
        && sizes[a.0] > 0
        && sizes[b.0] > 0
        && model
            .sequences()
            .iter()
            .any(|seq| seq.intervals.contains(&a) && seq.intervals.contains(&b))
}

/// Edge for `to >= from + delay` between two time points.
fn point_edge(from: TimePoint, to: TimePoint, delay: Delay, sizes: &[Delay]) -> Edge {
    let (u, v) = (from.interval().0, to.interval().0);
    (u, v, from.offset(sizes[u]) - to.offset(sizes[v]) + delay)
}

/// Earliest start times satisfying all edges with `start >= 0`.
///
/// Returns `None` when the edges contain a positive cycle.
fn longest_path(nodes: usize, edges: &[Edge]) -> Option<Vec<Delay>> {
    let mut dist = vec![0; nodes];
    for _ in 0..=nodes {
        let mut changed = false;
        for &(u, v, w) in edges {
            if dist[u] + w > dist[v] {
                dist[v] = dist[u] + w;
                changed = true;
            }
        }
        if !changed {
            return Some(dist);
        }
    }
    None
}
