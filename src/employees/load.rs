use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{EmployeeRecord, Population};

/// Errors raised while reading a population export.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not a JSON array of employee records.
    #[error("Invalid employee records at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load a JSON array of employee records from disk.
pub fn load_population(path: &Path) -> Result<Population, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let population = parse_population(&bytes).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        "Loaded {} employee records from {}",
        population.len(),
        path.display()
    );
    Ok(population)
}

/// Parse a JSON array of employee records.
pub fn parse_population(bytes: &[u8]) -> Result<Population, serde_json::Error> {
    let records: Vec<EmployeeRecord> = serde_json::from_slice(bytes)?;
    Ok(records.into())
}
