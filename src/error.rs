//! Error types for the data pipeline.
//!
//! Every fatal condition names the dataset it came from so a failed report
//! build can tell the caller which source file or entity to look at.

use crate::data::DatasetKind;
use crate::report::ChartError;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("{dataset}: missing {}. Save the statewide research file there.", .path.display())]
    MissingFile { dataset: DatasetKind, path: PathBuf },

    #[error("{dataset}: none of the columns {aliases:?} found for '{column}'. Have: {available:?}")]
    Schema {
        dataset: DatasetKind,
        column: &'static str,
        aliases: &'static [&'static str],
        available: Vec<String>,
    },

    #[error("{dataset}: no rows found for {entity}")]
    EntityNotFound { dataset: DatasetKind, entity: String },

    #[error("{dataset}: found {entity}, but no {level} rows")]
    NoAggregateLevelRows {
        dataset: DatasetKind,
        entity: String,
        level: &'static str,
    },

    #[error("unknown entity type '{0}' (expected 'district' or 'school')")]
    UnknownEntityType(String),

    #[error("{dataset}: failed to parse table: {source}")]
    Csv {
        dataset: DatasetKind,
        #[source]
        source: PolarsError,
    },

    #[error("{dataset}: failed to read {}: {source}", .path.display())]
    Io {
        dataset: DatasetKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    /// Dataset the error originated from, if any.
    pub fn dataset(&self) -> Option<DatasetKind> {
        match self {
            DataError::MissingFile { dataset, .. }
            | DataError::Schema { dataset, .. }
            | DataError::EntityNotFound { dataset, .. }
            | DataError::NoAggregateLevelRows { dataset, .. }
            | DataError::Csv { dataset, .. }
            | DataError::Io { dataset, .. } => Some(*dataset),
            DataError::UnknownEntityType(_) => None,
        }
    }
}

/// Failure of a complete report build, including writing the bundle.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{} is already the bundle for {claimed_by}", .dir.display())]
    BundleConflict { dir: PathBuf, claimed_by: String },
}
