//! JSON Lines record files.
//!
//! One flat JSON object per line, each with an `id`. Blank lines are skipped.
//! A malformed line or a repeated id aborts the load with its line number.

use crate::model::error::InputError;
use crate::model::{DynRecord, Record};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Load every record from a JSON Lines file.
///
/// # Errors
///
/// Returns `InputError::FileNotFound` if the file does not exist,
/// `InputError::Malformed` / `InputError::DuplicateId` for bad content and
/// `InputError::Io` for other I/O errors.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<DynRecord>, InputError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(InputError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    let records = parse_records(BufReader::new(file))?;
    info!(path = %path.display(), count = records.len(), "records loaded");
    Ok(records)
}

/// Parse JSON Lines records from any buffered reader.
pub fn parse_records(reader: impl BufRead) -> Result<Vec<DynRecord>, InputError> {
    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let record: DynRecord =
            serde_json::from_str(&line).map_err(|e| InputError::Malformed {
                line: line_number,
                reason: e.to_string(),
            })?;

        if !seen.insert(record.id()) {
            return Err(InputError::DuplicateId {
                id: record.id.to_string(),
                line: line_number,
            });
        }
        records.push(record);
    }

    Ok(records)
}
