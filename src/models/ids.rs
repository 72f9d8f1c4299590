//! Identifier newtypes and time units.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A duration, setup, due offset or start time in integer time units.
pub type Delay = i64;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of this id in a zero-based contiguous range.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Machine identifier, unique within a module.
    MachineId
);
id_type!(
    /// Job identifier, unique within a module.
    JobId
);
id_type!(
    /// Operation identifier, unique within a job.
    OperationId
);
id_type!(
    /// Module (flow-shop stage) identifier, unique within a production line.
    ModuleId
);

/// Full identity of an operation within a module: `(job, operation)`.
///
/// Orders job-major, so sorting keys groups operations by job and then
/// by operation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpKey {
    pub job: JobId,
    pub op: OperationId,
}

impl OpKey {
    /// Creates a key from raw job and operation indices.
    pub fn new(job: u32, op: u32) -> Self {
        Self {
            job: JobId(job),
            op: OperationId(op),
        }
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.job, self.op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_key_ordering_is_job_major() {
        let mut keys = vec![OpKey::new(1, 0), OpKey::new(0, 2), OpKey::new(0, 1)];
        keys.sort();
        assert_eq!(keys, vec![OpKey::new(0, 1), OpKey::new(0, 2), OpKey::new(1, 0)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(OpKey::new(3, 1).to_string(), "3_1");
        assert_eq!(ModuleId(7).to_string(), "7");
        assert_eq!(JobId(4).index(), 4);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&MachineId(2)).unwrap();
        assert_eq!(json, "2");
    }
}
