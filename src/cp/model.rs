//! CP model definition.

use std::collections::BTreeMap;
use std::io::{self, Write};

use super::variables::{IntervalId, IntervalVar, SequenceId, SequenceVar, TimePoint, TransitionMatrix};
use crate::models::Delay;

/// A constraint in the CP model.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `before + delay <= after`.
    Precedence {
        before: TimePoint,
        after: TimePoint,
        delay: Delay,
    },

    /// `bounded <= anchor + offset`.
    ///
    /// Limits how much later `bounded` may happen relative to `anchor`.
    Deadline {
        anchor: TimePoint,
        bounded: TimePoint,
        offset: Delay,
    },

    /// Members of a sequence never overlap.
    ///
    /// With `transitions`, an interval of type `b` placed directly after
    /// one of type `a` starts at least `transitions[a][b]` after it ends.
    NoOverlap {
        sequence: SequenceId,
        transitions: Option<TransitionMatrix>,
    },

    /// `if_before.0 < if_before.1` implies `then_before.0 < then_before.1`.
    IfThen {
        if_before: (TimePoint, TimePoint),
        then_before: (TimePoint, TimePoint),
    },
}

/// Objective function for the CP model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Minimize the end time of one interval.
    MinimizeEnd(IntervalId),
}

/// A constraint programming model over fixed-size intervals.
///
/// # Examples
///
/// ```
/// use u_flowline::cp::{CpModel, IntervalVar, Objective, TimePoint};
///
/// let mut model = CpModel::new("example");
/// let a = model.add_interval(IntervalVar::new("a", 50));
/// let b = model.add_interval(IntervalVar::new("b", 30));
/// model.add_precedence(TimePoint::End(a), TimePoint::Start(b), 0);
/// model.set_objective(Objective::MinimizeEnd(b));
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    intervals: Vec<IntervalVar>,
    sequences: Vec<SequenceVar>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
    starting_point: BTreeMap<IntervalId, Delay>,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds an interval variable and returns its id.
    pub fn add_interval(&mut self, var: IntervalVar) -> IntervalId {
        self.intervals.push(var);
        IntervalId(self.intervals.len() - 1)
    }

    /// Adds a sequence variable and returns its id.
    pub fn add_sequence(&mut self, var: SequenceVar) -> SequenceId {
        self.sequences.push(var);
        SequenceId(self.sequences.len() - 1)
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Convenience: `before + delay <= after`.
    pub fn add_precedence(&mut self, before: TimePoint, after: TimePoint, delay: Delay) {
        self.add_constraint(Constraint::Precedence {
            before,
            after,
            delay,
        });
    }

    /// Convenience: `bounded <= anchor + offset`.
    pub fn add_deadline(&mut self, anchor: TimePoint, bounded: TimePoint, offset: Delay) {
        self.add_constraint(Constraint::Deadline {
            anchor,
            bounded,
            offset,
        });
    }

    /// Convenience: no-overlap on a sequence.
    pub fn add_no_overlap(&mut self, sequence: SequenceId, transitions: Option<TransitionMatrix>) {
        self.add_constraint(Constraint::NoOverlap {
            sequence,
            transitions,
        });
    }

    /// Convenience: conditional strict ordering.
    pub fn add_if_then(
        &mut self,
        if_before: (TimePoint, TimePoint),
        then_before: (TimePoint, TimePoint),
    ) {
        self.add_constraint(Constraint::IfThen {
            if_before,
            then_before,
        });
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// The objective function, if set.
    pub fn objective(&self) -> Option<Objective> {
        self.objective
    }

    /// Registers a present, fixed-start hint for an interval.
    pub fn set_start_hint(&mut self, interval: IntervalId, start: Delay) {
        self.starting_point.insert(interval, start);
    }

    /// Warm-start hints.
    pub fn starting_point(&self) -> &BTreeMap<IntervalId, Delay> {
        &self.starting_point
    }

    /// Start times of a complete starting point, indexed by interval.
    ///
    /// `None` if any interval lacks a hint.
    pub fn starting_starts(&self) -> Option<Vec<Delay>> {
        (0..self.intervals.len())
            .map(|i| self.starting_point.get(&IntervalId(i)).copied())
            .collect()
    }

    /// Removes all warm-start hints.
    pub fn clear_starting_point(&mut self) {
        self.starting_point.clear();
    }

    /// Interval variables.
    pub fn intervals(&self) -> &[IntervalVar] {
        &self.intervals
    }

    /// Interval variable by id.
    pub fn interval(&self, id: IntervalId) -> Option<&IntervalVar> {
        self.intervals.get(id.0)
    }

    /// Sequence variables.
    pub fn sequences(&self) -> &[SequenceVar] {
        &self.sequences
    }

    /// Sequence variable by id.
    pub fn sequence(&self, id: SequenceId) -> Option<&SequenceVar> {
        self.sequences.get(id.0)
    }

    /// Constraints in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Value of a time point under the given start times.
    pub fn time_of(&self, point: TimePoint, starts: &[Delay]) -> Delay {
        let id = point.interval();
        starts[id.0] + point.offset(self.intervals[id.0].size)
    }

    /// Objective value under the given start times; zero without objective.
    pub fn objective_value(&self, starts: &[Delay]) -> Delay {
        match self.objective {
            Some(Objective::MinimizeEnd(id)) => self.time_of(TimePoint::End(id), starts),
            None => 0,
        }
    }

    /// Validates the model for consistency.
    ///
    /// Checks that all referenced intervals and sequences exist and that
    /// transition matrices cover every type tag.
    pub fn validate(&self) -> Result<(), String> {
        let check_point = |p: TimePoint| -> Result<(), String> {
            if p.interval().0 >= self.intervals.len() {
                return Err(format!("undefined interval: #{}", p.interval().0));
            }
            Ok(())
        };

        for seq in &self.sequences {
            if seq.intervals.len() != seq.types.len() {
                return Err(format!("sequence {}: intervals and types length mismatch", seq.name));
            }
            for id in &seq.intervals {
                check_point(TimePoint::Start(*id))?;
            }
        }

        for constraint in &self.constraints {
            match constraint {
                Constraint::Precedence { before, after, .. } => {
                    check_point(*before)?;
                    check_point(*after)?;
                }
                Constraint::Deadline {
                    anchor, bounded, ..
                } => {
                    check_point(*anchor)?;
                    check_point(*bounded)?;
                }
                Constraint::NoOverlap {
                    sequence,
                    transitions,
                } => {
                    let seq = self
                        .sequence(*sequence)
                        .ok_or_else(|| format!("undefined sequence: #{}", sequence.0))?;
                    if let Some(tm) = transitions {
                        if let Some(&t) = seq.types.iter().find(|&&t| t >= tm.size()) {
                            return Err(format!(
                                "sequence {}: type {t} outside transition matrix",
                                seq.name
                            ));
                        }
                    }
                }
                Constraint::IfThen {
                    if_before,
                    then_before,
                } => {
                    check_point(if_before.0)?;
                    check_point(if_before.1)?;
                    check_point(then_before.0)?;
                    check_point(then_before.1)?;
                }
            }
        }

        if let Some(Objective::MinimizeEnd(id)) = self.objective {
            check_point(TimePoint::End(id))?;
        }
        if let Some((id, _)) = self.starting_point.iter().find(|(id, _)| id.0 >= self.intervals.len()) {
            return Err(format!("starting point names undefined interval: #{}", id.0));
        }
        Ok(())
    }

    /// Returns the number of interval variables.
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn point_name(&self, p: TimePoint) -> String {
        let name = self
            .interval(p.interval())
            .map(|v| v.name.as_str())
            .unwrap_or("?");
        match p {
            TimePoint::Start(_) => format!("startOf({name})"),
            TimePoint::End(_) => format!("endOf({name})"),
        }
    }

    /// Writes a readable text form of the model.
    pub fn export(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "// model: {}", self.name)?;
        for var in &self.intervals {
            let optional = if var.optional { ", optional" } else { "" };
            writeln!(w, "{} = intervalVar(size={}{optional});", var.name, var.size)?;
        }
        for seq in &self.sequences {
            let members: Vec<&str> = seq
                .intervals
                .iter()
                .filter_map(|&id| self.interval(id).map(|v| v.name.as_str()))
                .collect();
            writeln!(
                w,
                "{} = sequenceVar([{}], types={:?});",
                seq.name,
                members.join(", "),
                seq.types
            )?;
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::Precedence {
                    before,
                    after,
                    delay,
                } => writeln!(
                    w,
                    "{} + {delay} <= {};",
                    self.point_name(*before),
                    self.point_name(*after)
                )?,
                Constraint::Deadline {
                    anchor,
                    bounded,
                    offset,
                } => writeln!(
                    w,
                    "{} + {offset} >= {};",
                    self.point_name(*anchor),
                    self.point_name(*bounded)
                )?,
                Constraint::NoOverlap {
                    sequence,
                    transitions,
                } => {
                    let name = self
                        .sequence(*sequence)
                        .map(|s| s.name.as_str())
                        .unwrap_or("?");
                    match transitions {
                        Some(tm) => {
                            let rows: Vec<String> =
                                tm.rows().map(|r| format!("{r:?}")).collect();
                            writeln!(w, "noOverlap({name}, [{}], 1);", rows.join(", "))?
                        }
                        None => writeln!(w, "noOverlap({name});")?,
                    }
                }
                Constraint::IfThen {
                    if_before,
                    then_before,
                } => writeln!(
                    w,
                    "ifThen({} < {}, {} < {});",
                    self.point_name(if_before.0),
                    self.point_name(if_before.1),
                    self.point_name(then_before.0),
                    self.point_name(then_before.1)
                )?,
            }
        }
        if let Some(Objective::MinimizeEnd(id)) = self.objective {
            writeln!(w, "minimize({});", self.point_name(TimePoint::End(id)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_interval_model() -> (CpModel, IntervalId, IntervalId) {
        let mut model = CpModel::new("test");
        let a = model.add_interval(IntervalVar::new("a", 5));
        let b = model.add_interval(IntervalVar::new("b", 3));
        (model, a, b)
    }

    #[test]
    fn test_model_creation() {
        let (mut model, a, b) = two_interval_model();
        let seq = model.add_sequence(SequenceVar::new("M", vec![a, b], vec![0, 1]));
        model.add_no_overlap(seq, None);
        model.add_no_overlap(seq, Some(TransitionMatrix::zeros(2)));
        model.set_objective(Objective::MinimizeEnd(b));

        assert_eq!(model.interval_count(), 2);
        assert_eq!(model.constraint_count(), 2);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_undefined_interval() {
        let (mut model, a, _) = two_interval_model();
        model.add_precedence(TimePoint::End(a), TimePoint::Start(IntervalId(9)), 0);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_transition_matrix_too_small() {
        let (mut model, a, b) = two_interval_model();
        let seq = model.add_sequence(SequenceVar::new("M", vec![a, b], vec![0, 1]));
        model.add_no_overlap(seq, Some(TransitionMatrix::zeros(1)));
        assert!(model.validate().unwrap_err().contains("transition matrix"));
    }

    #[test]
    fn test_objective_value() {
        let (mut model, _, b) = two_interval_model();
        assert_eq!(model.objective_value(&[0, 0]), 0);
        model.set_objective(Objective::MinimizeEnd(b));
        assert_eq!(model.objective_value(&[0, 5]), 8);
        assert_eq!(model.time_of(TimePoint::Start(b), &[0, 5]), 5);
    }

    #[test]
    fn test_starting_point() {
        let (mut model, a, b) = two_interval_model();
        model.set_start_hint(a, 0);
        assert!(model.starting_starts().is_none());
        model.set_start_hint(b, 5);
        assert_eq!(model.starting_starts(), Some(vec![0, 5]));
        model.clear_starting_point();
        assert!(model.starting_point().is_empty());
    }

    #[test]
    fn test_export_text() {
        let (mut model, a, b) = two_interval_model();
        model.add_precedence(TimePoint::End(a), TimePoint::Start(b), 2);
        model.add_deadline(TimePoint::Start(b), TimePoint::Start(a), 4);
        model.set_objective(Objective::MinimizeEnd(b));

        let mut out = Vec::new();
        model.export(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("a = intervalVar(size=5);"));
        assert!(text.contains("endOf(a) + 2 <= startOf(b);"));
        assert!(text.contains("startOf(b) + 4 >= startOf(a);"));
        assert!(text.contains("minimize(endOf(b));"));
    }
}
