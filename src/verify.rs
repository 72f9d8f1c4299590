//! Feasibility verification of start times against a CP model.
//!
//! Checks a candidate schedule without any solver: every constraint of
//! the model is evaluated on the given start times and each failure is
//! reported as a [`Violation`].

use serde::{Deserialize, Serialize};

use crate::cp::{Constraint, CpModel, TimePoint};
use crate::models::Delay;

/// A constraint violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Name of the interval or sequence involved.
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of constraint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Start times do not cover every interval.
    MissingStart,
    /// An interval starts before time zero.
    NegativeStart,
    /// A minimum-delay precedence is not met.
    PrecedenceViolation,
    /// A relative due date is exceeded.
    DeadlineViolation,
    /// Two intervals on the same sequence overlap.
    Overlap,
    /// Consecutive intervals are closer than their transition time.
    TransitionViolation,
    /// A conditional ordering is broken.
    OrderViolation,
}

impl Violation {
    fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

/// Verifies `starts` (indexed by interval id) against every constraint.
///
/// Returns an empty vector when the schedule is feasible.
pub fn verify(model: &CpModel, starts: &[Delay]) -> Vec<Violation> {
    if starts.len() != model.interval_count() {
        return vec![Violation::new(
            ViolationType::MissingStart,
            model.name.as_str(),
            format!(
                "{} start times given for {} intervals",
                starts.len(),
                model.interval_count()
            ),
        )];
    }

    let mut violations = Vec::new();
    let name = |p: TimePoint| model.intervals()[p.interval().0].name.clone();
    let at = |p: TimePoint| model.time_of(p, starts);

    for (i, var) in model.intervals().iter().enumerate() {
        if starts[i] < 0 {
            violations.push(Violation::new(
                ViolationType::NegativeStart,
                var.name.as_str(),
                format!("{} starts at {}", var.name, starts[i]),
            ));
        }
    }

    for constraint in model.constraints() {
        match constraint {
            Constraint::Precedence {
                before,
                after,
                delay,
            } => {
                if at(*before) + delay > at(*after) {
                    violations.push(Violation::new(
                        ViolationType::PrecedenceViolation,
                        name(*after),
                        format!(
                            "{} at {} + {delay} > {} at {}",
                            name(*before),
                            at(*before),
                            name(*after),
                            at(*after)
                        ),
                    ));
                }
            }
            Constraint::Deadline {
                anchor,
                bounded,
                offset,
            } => {
                if at(*bounded) > at(*anchor) + offset {
                    violations.push(Violation::new(
                        ViolationType::DeadlineViolation,
                        name(*bounded),
                        format!(
                            "{} at {} exceeds {} at {} + {offset}",
                            name(*bounded),
                            at(*bounded),
                            name(*anchor),
                            at(*anchor)
                        ),
                    ));
                }
            }
            Constraint::NoOverlap {
                sequence,
                transitions,
            } => {
                let Some(seq) = model.sequence(*sequence) else {
                    continue;
                };
                // (start, end, type, member index)
                let mut placed: Vec<(Delay, Delay, usize, usize)> = seq
                    .intervals
                    .iter()
                    .zip(&seq.types)
                    .enumerate()
                    .map(|(k, (&id, &t))| {
                        let start = starts[id.0];
                        (start, start + model.intervals()[id.0].size, t, k)
                    })
                    .collect();
                placed.sort();

                for i in 0..placed.len() {
                    for j in (i + 1)..placed.len() {
                        let (a, b) = (placed[i], placed[j]);
                        if a.0 < b.1 && b.0 < a.1 {
                            violations.push(Violation::new(
                                ViolationType::Overlap,
                                seq.name.as_str(),
                                format!(
                                    "{} [{}, {}) overlaps {} [{}, {})",
                                    model.intervals()[seq.intervals[a.3].0].name,
                                    a.0,
                                    a.1,
                                    model.intervals()[seq.intervals[b.3].0].name,
                                    b.0,
                                    b.1
                                ),
                            ));
                        }
                    }
                }

                if let Some(tm) = transitions {
                    for pair in placed.windows(2) {
                        let (a, b) = (pair[0], pair[1]);
                        let gap = tm.get(a.2, b.2);
                        if a.1 + gap > b.0 {
                            violations.push(Violation::new(
                                ViolationType::TransitionViolation,
                                seq.name.as_str(),
                                format!(
                                    "{} ends at {}, {} starts at {}, transition needs {gap}",
                                    model.intervals()[seq.intervals[a.3].0].name,
                                    a.1,
                                    model.intervals()[seq.intervals[b.3].0].name,
                                    b.0
                                ),
                            ));
                        }
                    }
                }
            }
            Constraint::IfThen {
                if_before,
                then_before,
            } => {
                if at(if_before.0) < at(if_before.1) && at(then_before.0) >= at(then_before.1) {
                    violations.push(Violation::new(
                        ViolationType::OrderViolation,
                        name(then_before.0),
                        format!(
                            "{} precedes {} but {} does not precede {}",
                            name(if_before.0),
                            name(if_before.1),
                            name(then_before.0),
                            name(then_before.1)
                        ),
                    ));
                }
            }
        }
    }

    violations
}
