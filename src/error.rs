// ⚠️ Error taxonomy
// Structural failures (unknown dataset, column-count mismatch, missing upstream
// data, unsupported export target) are typed here. Value-level parse failures
// never become errors: they degrade to null/zero inside the parser.

use crate::schema::Dataset;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),
}

/// Errors raised while reading or normalizing one import file
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse delimited data for {dataset}: {source}")]
    Csv {
        dataset: Dataset,
        #[source]
        source: csv::Error,
    },

    #[error("{dataset}: column count mismatch, expected {expected}, got {actual}")]
    ColumnCountMismatch {
        dataset: Dataset,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error on table {table}: {source}")]
    Table {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn on(dataset: Dataset) -> impl FnOnce(rusqlite::Error) -> StoreError {
        move |source| StoreError::Table {
            table: dataset.table_name(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export format '{0}' is not supported")]
    Unsupported(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write spreadsheet: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialize document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unknown report '{0}'")]
    UnknownReport(String),

    #[error("invalid reference period {month:02}/{year}")]
    InvalidPeriod { month: u32, year: i32 },

    #[error("missing upstream data: {} (import these datasets first)", join_datasets(.datasets))]
    MissingUpstreamData { datasets: Vec<Dataset> },

    #[error("no data found for report '{title}'")]
    NoData { title: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

fn join_datasets(datasets: &[Dataset]) -> String {
    datasets
        .iter()
        .map(|d| d.table_name())
        .collect::<Vec<_>>()
        .join(", ")
}
