use crate::domain::error::{AppError, Result};
use crate::domain::report::TestRecord;
use std::fs;
use std::path::Path;

/// Reads the normalized records produced by the report parser.
pub fn load_records(path: &Path) -> Result<Vec<TestRecord>> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AppError::Io(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_records(&raw)
        .map_err(|e| AppError::InvalidRecord(format!("{}: {}", path.display(), e)))
}

pub fn parse_records(raw: &str) -> std::result::Result<Vec<TestRecord>, serde_json::Error> {
    serde_json::from_str(raw)
}
