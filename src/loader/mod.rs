//! Production-line loading.
//!
//! Converts a JSON instance document ([`LineInstance`]) into populated
//! [`Flowshop`] modules and a [`ProductionLine`]. Documents are validated
//! as a whole first; a structurally broken instance never reaches the
//! encoder.

mod instance;

pub use instance::{
    FlowEntry, JobValue, LineInstance, LineType, MaintenanceInstance, ModuleInstance,
    OperationTable, OperationValue, PairValue, PairValues, TransferInstance, TypeThreshold,
    TypeValue,
};

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{MaintenanceThreshold, ShopConfig};
use crate::error::{Error, Result};
use crate::models::{
    Flowshop, Job, JobId, MachineId, MaintenancePolicy, ModuleId, OpKey, OperationId,
    PairTable, ProductionLine, TransferConstraints,
};
use crate::validation::validate_instance;

/// Reads and builds a production line from a JSON instance file.
///
/// # Errors
/// [`Error::FileNotFound`] before any parsing when `path` is missing,
/// then any error of [`build_line`].
pub fn load_line(path: impl AsRef<Path>, config: &ShopConfig) -> Result<ProductionLine> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let instance: LineInstance = serde_json::from_str(&contents)?;
    tracing::debug!(path = %path.display(), modules = instance.modules.len(), "instance parsed");
    build_line(&instance, config)
}

/// Validates an instance document and builds its production line.
///
/// # Errors
/// [`Error::UnsupportedLineType`] for an unknown `type`, otherwise
/// [`Error::InvalidInstance`] carrying every structural problem found.
pub fn build_line(instance: &LineInstance, config: &ShopConfig) -> Result<ProductionLine> {
    if instance.kind().is_none() {
        return Err(Error::UnsupportedLineType(instance.line_type.clone()));
    }
    validate_instance(instance).map_err(Error::InvalidInstance)?;

    let modules: BTreeMap<ModuleId, Flowshop> = instance
        .modules_by_id()
        .into_iter()
        .map(|(id, module)| {
            let id = ModuleId(id);
            (id, build_flowshop(id, module, config))
        })
        .collect();

    let mut setup = TransferConstraints::new();
    let mut due = TransferConstraints::new();
    for transfer in &instance.transfers {
        let key = (ModuleId(transfer.id_from), ModuleId(transfer.id_to));
        let setups = setup.entry(key).or_default();
        for entry in &transfer.setup_times {
            setups.insert(JobId(entry.j), entry.value);
        }
        let dues = due.entry(key).or_default();
        for entry in &transfer.relative_due_dates {
            dues.insert(JobId(entry.j), entry.value);
        }
    }

    let line = ProductionLine::new(modules, setup, due)?;
    tracing::info!(
        modules = line.modules().len(),
        operations = line.operation_count(),
        "production line loaded"
    );
    Ok(line)
}

/// Builds one module from its (validated) document.
///
/// Jobs are registered in ascending id, operations in flow-vector order.
/// Independent due dates are divided by the scale factor; every other
/// table is taken as-is.
pub fn build_flowshop(id: ModuleId, module: &ModuleInstance, config: &ShopConfig) -> Flowshop {
    let mut fs = Flowshop::new(
        id,
        module.machine_count(),
        module.jobs,
        module.operations,
        config,
    );
    if let Some(maintenance) = &module.maintenance {
        fs.maintenance = maintenance_policy(maintenance, config.scale);
    }

    let deadlines: BTreeMap<u32, i64> = module
        .absolute_deadlines
        .iter()
        .map(|d| (d.j, d.value))
        .collect();
    for &job in module.routes().keys() {
        let mut entry = Job::new(JobId(job));
        if let Some(&deadline) = deadlines.get(&job) {
            entry = entry.with_deadline(deadline);
        }
        fs.add_job(entry);
    }

    for entry in &module.flow_vector {
        let added = fs.add_operation(
            JobId(entry.job),
            OperationId(entry.index),
            module.processing_times.value(entry.job, entry.index),
            module.sizes.value(entry.job, entry.index),
            MachineId(entry.machine),
        );
        if added.is_none() {
            tracing::warn!(module = %id, job = entry.job, op = entry.index, "operation skipped");
        }
    }

    fs.setup = pair_table(module.setup_times.default, &module.setup_times.entries);
    for e in &module.setup_times_independent {
        fs.add_setup_independent(OpKey::new(e.j1, e.op1), OpKey::new(e.j2, e.op2), e.value);
    }
    fs.due = pair_table(None, &module.relative_due_dates);
    for e in &module.relative_due_dates_independent {
        fs.add_due_independent(
            OpKey::new(e.j1, e.op1),
            OpKey::new(e.j2, e.op2),
            config.scale_delay(e.value),
        );
    }

    fs
}

fn pair_table(default: Option<i64>, entries: &[PairValue]) -> PairTable {
    let mut table = PairTable::new();
    if let Some(fill) = default {
        table = table.with_fill(fill);
    }
    for e in entries {
        table.set(OpKey::new(e.j1, e.op1), OpKey::new(e.j2, e.op2), e.value);
    }
    table
}

fn maintenance_policy(maintenance: &MaintenanceInstance, scale: f64) -> MaintenancePolicy {
    let mut policy = MaintenancePolicy {
        durations: vec![0.0; maintenance.types],
        thresholds: vec![MaintenanceThreshold::new(0.0, 0.0); maintenance.types],
    };
    for p in &maintenance.processing_times {
        if let Some(slot) = policy.durations.get_mut(p.t) {
            *slot = p.value / scale;
        }
    }
    for t in &maintenance.thresholds {
        if let Some(slot) = policy.thresholds.get_mut(t.t) {
            *slot = MaintenanceThreshold::new(t.s / scale, t.e / scale);
        }
    }
    policy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;
    use std::io::Write;

    const TWO_MODULES: &str = r#"{
        "type": "Modular",
        "modules": [
            {
                "id": 0, "jobs": 2, "operations": 2,
                "flow_vector": [
                    {"job": 0, "index": 0, "machine": 0},
                    {"job": 0, "index": 1, "machine": 1},
                    {"job": 1, "index": 0, "machine": 0},
                    {"job": 1, "index": 1, "machine": 1}
                ],
                "processing_times": {"default": 2, "entries": [{"j": 1, "op": 1, "value": 6}]},
                "absolute_deadlines": [{"j": 1, "value": 90}],
                "setup_times": {"entries": [{"j1": 0, "op1": 0, "j2": 1, "op2": 0, "value": 3}]},
                "setup_times_independent": [{"j1": 0, "op1": 1, "j2": 1, "op2": 1, "value": 5}],
                "relative_due_dates_independent": [{"j1": 1, "op1": 0, "j2": 0, "op2": 0, "value": 40}]
            },
            {
                "id": 1, "jobs": 2, "operations": 1,
                "flow_vector": [
                    {"job": 0, "index": 0, "machine": 0},
                    {"job": 1, "index": 0, "machine": 0}
                ],
                "processing_times": {"default": 4}
            }
        ],
        "transfers": [
            {"id_from": 0, "id_to": 1,
             "setup_times": [{"j": 0, "value": 1}],
             "relative_due_dates": [{"j": 1, "value": 20}]}
        ]
    }"#;

    fn instance(doc: &str) -> LineInstance {
        serde_json::from_str(doc).unwrap()
    }

    #[test]
    fn test_build_line() {
        let config = ShopConfig::default().with_scale(10.0);
        let line = build_line(&instance(TWO_MODULES), &config).unwrap();

        assert_eq!(line.modules().len(), 2);
        assert_eq!(line.last_module_id(), ModuleId(1));
        assert_eq!(line.operation_count(), 6);
        assert_eq!(line.transfer_setup(ModuleId(0), ModuleId(1), JobId(0)), 1);
        assert_eq!(line.transfer_setup(ModuleId(0), ModuleId(1), JobId(1)), 0);
        assert_eq!(line.transfer_due(ModuleId(0), ModuleId(1), JobId(1)), Some(20));

        let fs = line.module(ModuleId(0)).unwrap();
        assert_eq!(fs.machine_count(), 2);
        assert_eq!(fs.operation(OpKey::new(1, 1)).unwrap().processing, 6);
        assert_eq!(fs.operation(OpKey::new(0, 1)).unwrap().machine, MachineId(1));
        assert_eq!(fs.job(JobId(1)).unwrap().deadline, Some(90));
        assert_eq!(fs.query(OpKey::new(0, 0), OpKey::new(1, 0)), 3);
        assert_eq!(fs.query(OpKey::new(0, 1), OpKey::new(1, 1)), 5);
        // independent due dates are scaled
        assert_eq!(
            fs.due_date_independent(OpKey::new(1, 0), OpKey::new(0, 0)),
            Some(4)
        );
        assert_eq!(fs.machine(MachineId(0)).unwrap().operations.len(), 2);
    }

    #[test]
    fn test_single_module_type() {
        let doc = r#"{
            "type": "FORPFSSPSD",
            "modules": [{
                "id": 7, "jobs": 1, "operations": 1,
                "flow_vector": [{"job": 0, "index": 0, "machine": 0}],
                "maintenance": {
                    "types": 2,
                    "processing_times": [{"t": 1, "value": 50.0}],
                    "thresholds": [{"t": 0, "s": 100.0, "e": 20.0}]
                }
            }]
        }"#;
        let line = build_line(&instance(doc), &ShopConfig::default().with_scale(10.0)).unwrap();
        let fs = line.last_module();
        assert_eq!(fs.id, ModuleId(0));
        assert_eq!(fs.maintenance.durations, vec![0.0, 5.0]);
        assert_eq!(fs.maintenance.thresholds[0], MaintenanceThreshold::new(10.0, 2.0));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let doc = TWO_MODULES.replace("\"Modular\"", "\"JobShop\"");
        let err = build_line(&instance(&doc), &ShopConfig::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLineType(t) if t == "JobShop"));
    }

    #[test]
    fn test_non_consecutive_transfer_fails_at_load() {
        let doc = TWO_MODULES.replace("\"id\": 1,", "\"id\": 3,").replace(
            "\"id_to\": 1",
            "\"id_to\": 3",
        );
        let err = build_line(&instance(&doc), &ShopConfig::default()).unwrap_err();
        match err {
            Error::InvalidInstance(errors) => {
                assert!(errors
                    .iter()
                    .any(|e| e.kind == ValidationErrorKind::InvalidTransfer));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_due_tables_share_orientation() {
        let doc = TWO_MODULES.replace(
            "\"relative_due_dates_independent\"",
            "\"relative_due_dates\": [{\"j1\": 1, \"op1\": 0, \"j2\": 0, \"op2\": 0, \"value\": 3}],
                \"relative_due_dates_independent\"",
        );
        let line = build_line(&instance(&doc), &ShopConfig::default().with_scale(10.0)).unwrap();
        let fs = line.module(ModuleId(0)).unwrap();
        let (from, to) = (OpKey::new(1, 0), OpKey::new(0, 0));

        assert_eq!(fs.due.get(from, to), Some(3));
        assert_eq!(fs.due.get(to, from), None);
        assert_eq!(fs.due_bound(from, to), Some(3));
        assert_eq!(fs.due_bound(to, from), None);
    }

    #[test]
    fn test_negative_processing_time_fails_at_load() {
        let doc = TWO_MODULES.replace("{\"default\": 4}", "{\"default\": -7}");
        let err = build_line(&instance(&doc), &ShopConfig::default()).unwrap_err();
        match err {
            Error::InvalidInstance(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].kind, ValidationErrorKind::NegativeDuration);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_line_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TWO_MODULES.as_bytes()).unwrap();

        let line = load_line(file.path(), &ShopConfig::default()).unwrap();
        assert_eq!(line.modules().len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_line("/nonexistent/line.json", &ShopConfig::default()).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
