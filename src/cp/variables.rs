//! CP variable types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Delay;

/// Index of an interval variable within its [`super::CpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntervalId(pub usize);

/// Index of a sequence variable within its [`super::CpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub usize);

/// A fixed-size interval: `end = start + size`.
///
/// # Examples
///
/// ```
/// use u_flowline::cp::IntervalVar;
///
/// let op = IntervalVar::new("O0_0_0", 50);
/// assert_eq!(op.size, 50);
/// assert!(!op.optional);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalVar {
    /// Variable name (unique within a model).
    pub name: String,
    /// Fixed duration.
    pub size: Delay,
    /// Whether the interval may be absent from a solution.
    pub optional: bool,
}

impl IntervalVar {
    /// Creates a mandatory interval of the given size.
    pub fn new(name: impl Into<String>, size: Delay) -> Self {
        Self {
            name: name.into(),
            size,
            optional: false,
        }
    }
}

/// The ordering of a set of intervals on one unary resource.
///
/// Each member carries an integer type tag that selects its row and
/// column in a [`TransitionMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceVar {
    /// Variable name.
    pub name: String,
    /// Member intervals.
    pub intervals: Vec<IntervalId>,
    /// Type tag of each member (parallel to `intervals`).
    pub types: Vec<usize>,
}

impl SequenceVar {
    /// Creates a sequence over `intervals` with the given type tags.
    pub fn new(name: impl Into<String>, intervals: Vec<IntervalId>, types: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            intervals,
            types,
        }
    }

    /// Number of member intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the sequence has no members.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Type tag of a member interval.
    pub fn type_of(&self, interval: IntervalId) -> Option<usize> {
        self.intervals
            .iter()
            .position(|&i| i == interval)
            .map(|pos| self.types[pos])
    }
}

/// Square matrix of minimum gaps between consecutive intervals of a
/// sequence, indexed by `(from_type, to_type)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    size: usize,
    values: Vec<Delay>,
}

impl TransitionMatrix {
    /// Builds a `size x size` matrix from a function of `(from, to)`.
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> Delay) -> Self {
        let mut values = Vec::with_capacity(size * size);
        for from in 0..size {
            for to in 0..size {
                values.push(f(from, to));
            }
        }
        Self { size, values }
    }

    /// All-zero matrix.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0; size * size],
        }
    }

    /// Number of types.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Gap required when `to` directly follows `from`.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> Delay {
        self.values[from * self.size + to]
    }

    /// Whether every entry is zero.
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }

    /// Element-wise maximum with another matrix of the same size.
    pub fn max_with(&self, other: &TransitionMatrix) -> TransitionMatrix {
        TransitionMatrix::from_fn(self.size, |a, b| self.get(a, b).max(other.get(a, b)))
    }

    /// Rows of the matrix.
    pub fn rows(&self) -> impl Iterator<Item = &[Delay]> {
        self.values.chunks(self.size.max(1))
    }
}

/// The start or end of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePoint {
    Start(IntervalId),
    End(IntervalId),
}

impl TimePoint {
    /// The interval this point belongs to.
    #[inline]
    pub fn interval(self) -> IntervalId {
        match self {
            TimePoint::Start(id) | TimePoint::End(id) => id,
        }
    }

    /// Offset of this point from the interval's start.
    #[inline]
    pub fn offset(self, size: Delay) -> Delay {
        match self {
            TimePoint::Start(_) => 0,
            TimePoint::End(_) => size,
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePoint::Start(id) => write!(f, "startOf(#{})", id.0),
            TimePoint::End(id) => write!(f, "endOf(#{})", id.0),
        }
    }
}
