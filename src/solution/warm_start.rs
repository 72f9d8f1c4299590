//! Warm-start files and their application to an encoded line.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cp::IntervalId;
use crate::encoder::EncodedLine;
use crate::error::{Error, Result};
use crate::models::{parse_key, Delay, JobId, ModuleId, OpKey, OperationId, ProductionLine, TimingTable};

/// CBOR document holding a timing table under `solution`.
///
/// Any other key is ignored, so a persisted result record doubles as a
/// warm start.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WarmStartFile {
    #[serde(default)]
    solution: TimingTable,
}

/// Reads the timing table of a CBOR warm-start file.
///
/// # Errors
/// [`Error::FileNotFound`] when `path` does not exist.
pub fn read_warm_start(path: impl AsRef<Path>) -> Result<TimingTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    let file: WarmStartFile = ciborium::from_reader(reader)?;
    Ok(file.solution)
}

/// Writes a timing table as a CBOR warm-start file.
pub fn write_warm_start(path: impl AsRef<Path>, timing: &TimingTable) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    ciborium::into_writer(
        &WarmStartFile {
            solution: timing.clone(),
        },
        writer,
    )?;
    Ok(())
}

/// Registers `timing` as the warm start of `encoded` and copies the start
/// times into `line`.
///
/// Every key is resolved before anything is modified.
///
/// # Errors
/// [`Error::InvalidKey`] for a non-numeric key, then
/// [`Error::UnknownModule`], [`Error::UnknownJob`] or
/// [`Error::UnknownOperation`] for the first unresolved identifier.
pub fn apply_solution(
    encoded: &mut EncodedLine,
    line: &mut ProductionLine,
    timing: &TimingTable,
) -> Result<usize> {
    let mut hints: Vec<(IntervalId, Delay)> = Vec::new();
    for (module_key, jobs) in timing {
        let module = ModuleId(parse_key(module_key)?);
        let fs = line.module(module).ok_or(Error::UnknownModule(module))?;
        for (job_key, ops) in jobs {
            let job = JobId(parse_key(job_key)?);
            if fs.job(job).is_none() {
                return Err(Error::UnknownJob { module, job });
            }
            for (op_key, &start) in ops {
                let op = OperationId(parse_key(op_key)?);
                let id = encoded
                    .interval(module, OpKey { job, op })
                    .ok_or(Error::UnknownOperation { module, job, op })?;
                hints.push((id, start));
            }
        }
    }

    line.apply_start_times(timing)?;
    let model = encoded.model_mut();
    for &(id, start) in &hints {
        model.set_start_hint(id, start);
    }
    tracing::debug!(hints = hints.len(), "warm start applied");
    Ok(hints.len())
}
