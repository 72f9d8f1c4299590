//! Structural validation of production-line instances.
//!
//! Checks an instance document before any domain object is built.
//! Detects:
//! - Unsupported line types and wrong module counts
//! - Duplicate module ids and transfer declarations
//! - Routes outside the declared job/operation ranges
//! - Non-contiguous job and operation ids
//! - Table entries naming unknown operations
//! - Negative processing times
//! - Missing, non-consecutive or dangling transfer declarations

use std::collections::{BTreeSet, HashSet};

use crate::loader::{LineInstance, LineType, ModuleInstance, PairValue};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The line type is neither `Modular` nor `FORPFSSPSD`.
    UnsupportedType,
    /// The instance declares no module.
    EmptyLine,
    /// A single-module line declares more than one module.
    ModuleCount,
    /// Two entities share the same ID.
    DuplicateId,
    /// A module has no jobs.
    EmptyModule,
    /// A route exceeds the declared job or operation count.
    OutOfRange,
    /// Job or operation ids do not form a zero-based contiguous range.
    NonContiguousIds,
    /// A table entry names an operation absent from the routes.
    UnknownOperation,
    /// A processing time is negative.
    NegativeDuration,
    /// The number of transfer declarations is not `modules - 1`.
    TransferCount,
    /// A transfer does not link two existing consecutive modules.
    InvalidTransfer,
    /// A transfer entry names a job absent from one of its modules.
    UnknownJob,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates an instance document.
///
/// Checks:
/// 1. Supported line type, at least one module, exactly one for
///    single-module lines
/// 2. No duplicate module ids
/// 3. Every module: jobs present, routes in range and contiguous, table
///    entries referring to routed operations, no negative processing time
/// 4. Exactly `modules - 1` transfers, each linking `n` to `n + 1`
/// 5. Transfer entries naming jobs routed in both modules
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_instance(instance: &LineInstance) -> ValidationResult {
    let mut errors = Vec::new();

    let Some(kind) = instance.kind() else {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnsupportedType,
            format!("Problem type {} not supported", instance.line_type),
        ));
        return Err(errors);
    };

    if instance.modules.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyLine,
            "Instance declares no module",
        ));
        return Err(errors);
    }
    if kind == LineType::Single && instance.modules.len() != 1 {
        errors.push(ValidationError::new(
            ValidationErrorKind::ModuleCount,
            format!(
                "Single-module instance declares {} modules",
                instance.modules.len()
            ),
        ));
    }

    let mut module_ids = HashSet::new();
    for (position, module) in instance.modules.iter().enumerate() {
        let id = instance.module_id(position);
        if !module_ids.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate module ID: {id}"),
            ));
        }
        validate_module(id, module, &mut errors);
    }

    validate_transfers(instance, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_module(id: u32, module: &ModuleInstance, errors: &mut Vec<ValidationError>) {
    if module.jobs == 0 || module.flow_vector.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyModule,
            format!("Module {id} has no jobs"),
        ));
        return;
    }

    let mut seen = HashSet::new();
    for entry in &module.flow_vector {
        if entry.job as usize >= module.jobs || entry.index as usize >= module.operations {
            errors.push(ValidationError::new(
                ValidationErrorKind::OutOfRange,
                format!(
                    "Module {id}: operation {}_{} outside {} jobs x {} operations",
                    entry.job, entry.index, module.jobs, module.operations
                ),
            ));
        }
        if !seen.insert((entry.job, entry.index)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Module {id}: duplicate operation {}_{}", entry.job, entry.index),
            ));
        }
    }

    let routes = module.routes();
    let jobs: BTreeSet<u32> = routes.keys().copied().collect();
    if !jobs.iter().copied().eq(0..jobs.len() as u32) {
        errors.push(ValidationError::new(
            ValidationErrorKind::NonContiguousIds,
            format!("Module {id}: job ids {jobs:?} are not contiguous from 0"),
        ));
    }
    for (job, ops) in &routes {
        if !ops.iter().copied().eq(0..ops.len() as u32) {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonContiguousIds,
                format!("Module {id}: job {job} routes operations {ops:?}, expected 0.."),
            ));
        }
    }

    let operation_tables = module
        .processing_times
        .entries
        .iter()
        .chain(&module.sizes.entries)
        .map(|e| (e.j, e.op));
    for (job, op) in operation_tables {
        if !module.has_operation(job, op) {
            errors.push(unknown_operation(id, job, op));
        }
    }
    if let Some(default) = module.processing_times.default.filter(|&v| v < 0) {
        errors.push(ValidationError::new(
            ValidationErrorKind::NegativeDuration,
            format!("Module {id}: default processing time {default} is negative"),
        ));
    }
    for entry in module.processing_times.entries.iter().filter(|e| e.value < 0) {
        errors.push(ValidationError::new(
            ValidationErrorKind::NegativeDuration,
            format!(
                "Module {id}: processing time {} of operation {}_{} is negative",
                entry.value, entry.j, entry.op
            ),
        ));
    }
    for deadline in &module.absolute_deadlines {
        if !module.has_job(deadline.j) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownJob,
                format!("Module {id}: deadline for unknown job {}", deadline.j),
            ));
        }
    }

    let pairs = module
        .setup_times
        .entries
        .iter()
        .chain(&module.setup_times_independent)
        .chain(&module.relative_due_dates)
        .chain(&module.relative_due_dates_independent);
    for &PairValue { j1, op1, j2, op2, .. } in pairs {
        for (job, op) in [(j1, op1), (j2, op2)] {
            if !module.has_operation(job, op) {
                errors.push(unknown_operation(id, job, op));
            }
        }
    }
}

fn unknown_operation(module: u32, job: u32, op: u32) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::UnknownOperation,
        format!("Module {module}: table entry names unknown operation {job}_{op}"),
    )
}

fn validate_transfers(instance: &LineInstance, errors: &mut Vec<ValidationError>) {
    let modules = instance.modules_by_id();
    if instance.transfers.len() + 1 != instance.modules.len() {
        errors.push(ValidationError::new(
            ValidationErrorKind::TransferCount,
            format!(
                "Expected {} transfer declarations, found {}",
                instance.modules.len() - 1,
                instance.transfers.len()
            ),
        ));
    }

    let mut pairs = HashSet::new();
    for transfer in &instance.transfers {
        let (from, to) = (transfer.id_from, transfer.id_to);
        if !pairs.insert((from, to)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate transfer {from} -> {to}"),
            ));
        }
        let (Some(upstream), Some(downstream)) = (modules.get(&from), modules.get(&to)) else {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTransfer,
                format!("Transfer {from} -> {to} names an unknown module"),
            ));
            continue;
        };
        if from.checked_add(1) != Some(to) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTransfer,
                format!("Transfer {from} -> {to} does not link consecutive modules"),
            ));
        }

        for entry in transfer.setup_times.iter().chain(&transfer.relative_due_dates) {
            if !upstream.has_job(entry.j) || !downstream.has_job(entry.j) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownJob,
                    format!("Transfer {from} -> {to} names job {} absent from a module", entry.j),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{FlowEntry, JobValue, OperationValue, TransferInstance};

    fn module(id: u32, jobs: u32, ops: u32) -> ModuleInstance {
        let flow_vector = (0..jobs)
            .flat_map(|job| {
                (0..ops).map(move |index| FlowEntry {
                    job,
                    index,
                    machine: index,
                })
            })
            .collect();
        ModuleInstance {
            id,
            jobs: jobs as usize,
            operations: ops as usize,
            flow_vector,
            ..Default::default()
        }
    }

    fn transfer(from: u32, to: u32) -> TransferInstance {
        TransferInstance {
            id_from: from,
            id_to: to,
            ..Default::default()
        }
    }

    fn line(modules: Vec<ModuleInstance>, transfers: Vec<TransferInstance>) -> LineInstance {
        LineInstance {
            line_type: "Modular".into(),
            modules,
            transfers,
        }
    }

    fn kinds(result: ValidationResult) -> Vec<ValidationErrorKind> {
        result.unwrap_err().into_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_valid_instance() {
        let instance = line(vec![module(0, 2, 2), module(1, 2, 1)], vec![transfer(0, 1)]);
        assert!(validate_instance(&instance).is_ok());
    }

    #[test]
    fn test_unsupported_type() {
        let mut instance = line(vec![module(0, 1, 1)], vec![]);
        instance.line_type = "JobShop".into();
        assert_eq!(
            kinds(validate_instance(&instance)),
            vec![ValidationErrorKind::UnsupportedType]
        );
    }

    #[test]
    fn test_empty_line() {
        let instance = line(vec![], vec![]);
        assert_eq!(
            kinds(validate_instance(&instance)),
            vec![ValidationErrorKind::EmptyLine]
        );
    }

    #[test]
    fn test_single_type_with_two_modules() {
        let mut instance = line(vec![module(0, 1, 1), module(1, 1, 1)], vec![transfer(0, 1)]);
        instance.line_type = "FORPFSSPSD".into();
        let found = kinds(validate_instance(&instance));
        assert!(found.contains(&ValidationErrorKind::ModuleCount));
        // both modules collapse onto id 0
        assert!(found.contains(&ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_non_consecutive_transfer() {
        let instance = line(vec![module(0, 1, 1), module(2, 1, 1)], vec![transfer(0, 2)]);
        assert_eq!(
            kinds(validate_instance(&instance)),
            vec![ValidationErrorKind::InvalidTransfer]
        );
    }

    #[test]
    fn test_missing_transfer() {
        let instance = line(vec![module(0, 1, 1), module(1, 1, 1)], vec![]);
        assert_eq!(
            kinds(validate_instance(&instance)),
            vec![ValidationErrorKind::TransferCount]
        );
    }

    #[test]
    fn test_transfer_unknown_job() {
        let mut t = transfer(0, 1);
        t.setup_times.push(JobValue { j: 3, value: 2 });
        let instance = line(vec![module(0, 2, 1), module(1, 2, 1)], vec![t]);
        assert_eq!(
            kinds(validate_instance(&instance)),
            vec![ValidationErrorKind::UnknownJob]
        );
    }

    #[test]
    fn test_routes_checked() {
        let mut m = module(0, 2, 2);
        m.flow_vector.retain(|e| !(e.job == 1 && e.index == 0));
        m.flow_vector.push(FlowEntry {
            job: 0,
            index: 5,
            machine: 0,
        });
        let found = kinds(validate_instance(&line(vec![m], vec![])));
        assert!(found.contains(&ValidationErrorKind::OutOfRange));
        assert!(found.contains(&ValidationErrorKind::NonContiguousIds));
    }

    #[test]
    fn test_table_entry_unknown_operation() {
        let mut m = module(0, 1, 2);
        m.setup_times_independent.push(PairValue {
            j1: 0,
            op1: 1,
            j2: 4,
            op2: 0,
            value: 3,
        });
        assert_eq!(
            kinds(validate_instance(&line(vec![m], vec![]))),
            vec![ValidationErrorKind::UnknownOperation]
        );
    }

    #[test]
    fn test_empty_module() {
        let mut m = module(0, 1, 1);
        m.flow_vector.clear();
        assert_eq!(
            kinds(validate_instance(&line(vec![m], vec![]))),
            vec![ValidationErrorKind::EmptyModule]
        );
    }

    #[test]
    fn test_negative_processing_times() {
        let mut m = module(0, 2, 1);
        m.processing_times.default = Some(-7);
        m.processing_times.entries.push(OperationValue {
            j: 1,
            op: 0,
            value: -1,
        });
        assert_eq!(
            kinds(validate_instance(&line(vec![m], vec![]))),
            vec![
                ValidationErrorKind::NegativeDuration,
                ValidationErrorKind::NegativeDuration
            ]
        );
    }

    #[test]
    fn test_zero_processing_time_is_valid() {
        let mut m = module(0, 1, 1);
        m.processing_times.default = Some(0);
        assert!(validate_instance(&line(vec![m], vec![])).is_ok());
    }
}
