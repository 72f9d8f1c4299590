//! Serde document types of a production-line instance.
//!
//! The document mirrors the attribute contract of the XML instance files
//! used by the printer-line benchmarks: a line `type`, one entry per
//! module, and one transfer declaration per consecutive module pair.
//!
//! ```json
//! {
//!   "type": "Modular",
//!   "modules": [
//!     { "id": 0, "jobs": 2, "operations": 1,
//!       "flow_vector": [ { "job": 0, "index": 0, "machine": 0 },
//!                        { "job": 1, "index": 0, "machine": 0 } ],
//!       "processing_times": { "default": 3 } }
//!   ],
//!   "transfers": []
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Supported line layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    /// Several modules chained by transfers.
    Modular,
    /// A single flow-shop module (`FORPFSSPSD`).
    Single,
}

impl LineType {
    /// Parses the document's `type` attribute.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Modular" => Some(Self::Modular),
            "FORPFSSPSD" => Some(Self::Single),
            _ => None,
        }
    }
}

/// Root of an instance document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInstance {
    #[serde(rename = "type")]
    pub line_type: String,
    #[serde(default)]
    pub modules: Vec<ModuleInstance>,
    #[serde(default)]
    pub transfers: Vec<TransferInstance>,
}

impl LineInstance {
    /// Parsed line type, `None` when unsupported.
    pub fn kind(&self) -> Option<LineType> {
        LineType::parse(&self.line_type)
    }

    /// Effective id of the module at `position`. Single-module lines
    /// always use module 0.
    pub fn module_id(&self, position: usize) -> u32 {
        match self.kind() {
            Some(LineType::Single) => 0,
            _ => self.modules.get(position).map_or(0, |m| m.id),
        }
    }

    /// Modules keyed by effective id. Later duplicates are dropped.
    pub fn modules_by_id(&self) -> BTreeMap<u32, &ModuleInstance> {
        let mut map = BTreeMap::new();
        for (position, module) in self.modules.iter().enumerate() {
            map.entry(self.module_id(position)).or_insert(module);
        }
        map
    }
}

/// One flow-shop module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleInstance {
    #[serde(default)]
    pub id: u32,
    /// Declared job count.
    pub jobs: usize,
    /// Declared operations per job.
    pub operations: usize,
    /// Job routes: operation `index` of `job` runs on `machine`, listed in
    /// precedence order.
    pub flow_vector: Vec<FlowEntry>,
    #[serde(default)]
    pub processing_times: OperationTable,
    #[serde(default)]
    pub absolute_deadlines: Vec<JobValue>,
    #[serde(default)]
    pub setup_times: PairValues,
    #[serde(default)]
    pub setup_times_independent: Vec<PairValue>,
    #[serde(default)]
    pub relative_due_dates: Vec<PairValue>,
    #[serde(default)]
    pub relative_due_dates_independent: Vec<PairValue>,
    #[serde(default)]
    pub sizes: OperationTable,
    #[serde(default)]
    pub maintenance: Option<MaintenanceInstance>,
}

impl ModuleInstance {
    /// Machine count: highest machine index in the flow vector plus one.
    pub fn machine_count(&self) -> usize {
        self.flow_vector
            .iter()
            .map(|e| e.machine as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Operation indices of each job in flow-vector order.
    pub fn routes(&self) -> BTreeMap<u32, Vec<u32>> {
        let mut routes: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for entry in &self.flow_vector {
            routes.entry(entry.job).or_default().push(entry.index);
        }
        routes
    }

    /// Whether operation `op` of `job` appears in the flow vector.
    pub fn has_operation(&self, job: u32, op: u32) -> bool {
        self.flow_vector.iter().any(|e| e.job == job && e.index == op)
    }

    /// Whether `job` appears in the flow vector.
    pub fn has_job(&self, job: u32) -> bool {
        self.flow_vector.iter().any(|e| e.job == job)
    }
}

/// Assignment of one operation to a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEntry {
    pub job: u32,
    pub index: u32,
    pub machine: u32,
}

/// Per-operation values with an optional default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationTable {
    #[serde(default)]
    pub default: Option<i64>,
    #[serde(default)]
    pub entries: Vec<OperationValue>,
}

impl OperationTable {
    /// Value of an operation: explicit entry, else default, else zero.
    pub fn value(&self, job: u32, op: u32) -> i64 {
        self.entries
            .iter()
            .rev()
            .find(|e| e.j == job && e.op == op)
            .map(|e| e.value)
            .or(self.default)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationValue {
    pub j: u32,
    pub op: u32,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobValue {
    pub j: u32,
    pub value: i64,
}

/// Pairwise values with an optional fill for undeclared pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairValues {
    #[serde(default)]
    pub default: Option<i64>,
    #[serde(default)]
    pub entries: Vec<PairValue>,
}

/// Value attached to the ordered pair `(j1, op1) -> (j2, op2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairValue {
    pub j1: u32,
    pub op1: u32,
    pub j2: u32,
    pub op2: u32,
    pub value: i64,
}

/// Module-specific maintenance data, unscaled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceInstance {
    /// Number of maintenance types.
    pub types: usize,
    #[serde(default)]
    pub processing_times: Vec<TypeValue>,
    #[serde(default)]
    pub thresholds: Vec<TypeThreshold>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeValue {
    pub t: usize,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeThreshold {
    pub t: usize,
    pub s: f64,
    pub e: f64,
}

/// Transfer declaration between two consecutive modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferInstance {
    pub id_from: u32,
    pub id_to: u32,
    #[serde(default)]
    pub setup_times: Vec<JobValue>,
    #[serde(default)]
    pub relative_due_dates: Vec<JobValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let doc = r#"{
            "type": "FORPFSSPSD",
            "modules": [{
                "id": 4, "jobs": 1, "operations": 2,
                "flow_vector": [
                    {"job": 0, "index": 0, "machine": 0},
                    {"job": 0, "index": 1, "machine": 2}
                ],
                "processing_times": {"default": 5, "entries": [{"j": 0, "op": 1, "value": 7}]},
                "setup_times": {"default": 1}
            }]
        }"#;
        let instance: LineInstance = serde_json::from_str(doc).unwrap();

        assert_eq!(instance.kind(), Some(LineType::Single));
        assert_eq!(instance.module_id(0), 0);
        assert!(instance.transfers.is_empty());
        let module = &instance.modules[0];
        assert_eq!(module.machine_count(), 3);
        assert_eq!(module.processing_times.value(0, 0), 5);
        assert_eq!(module.processing_times.value(0, 1), 7);
        assert_eq!(module.sizes.value(0, 0), 0);
        assert_eq!(module.setup_times.default, Some(1));
        assert_eq!(module.routes()[&0], vec![0, 1]);
    }

    #[test]
    fn test_unsupported_type() {
        assert_eq!(LineType::parse("Modular"), Some(LineType::Modular));
        assert_eq!(LineType::parse("JobShop"), None);
    }
}
