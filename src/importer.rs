// 📥 Import Job - parse + normalize + store as one unit of work
//
// Reports discrete progress milestones and a terminal outcome. One job runs
// at a time per store handle (the job borrows the store mutably), which is
// how concurrent replaces of one dataset are serialized.

use crate::db::TableStore;
use crate::error::IngestError;
use crate::parser::normalize;
use crate::schema::Dataset;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

// ============================================================================
// PROGRESS + OUTCOME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportProgress {
    Started,
    Normalized { rows: usize },
    Completed,
}

impl ImportProgress {
    pub fn percent(&self) -> u8 {
        match self {
            ImportProgress::Started => 10,
            ImportProgress::Normalized { .. } => 50,
            ImportProgress::Completed => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImportOutcome {
    Imported {
        dataset: Dataset,
        rows: usize,
        imported_at: NaiveDateTime,
    },
    /// The file parsed but held no row with a name; the table is untouched
    NoValidRows { dataset: Dataset },
}

impl ImportOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, ImportOutcome::Imported { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            ImportOutcome::Imported { .. } => "Importação concluída com sucesso.",
            ImportOutcome::NoValidRows { .. } => {
                "Arquivo processado, mas não continha linhas válidas."
            }
        }
    }
}

/// Terminal signal for callers that only want success + message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatus {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// IMPORT JOB
// ============================================================================

#[derive(Debug, Clone)]
pub struct ImportJob {
    pub dataset: Dataset,
    pub path: PathBuf,
}

impl ImportJob {
    pub fn new(dataset: Dataset, path: impl Into<PathBuf>) -> Self {
        ImportJob {
            dataset,
            path: path.into(),
        }
    }

    /// Resolve the dataset by registry name
    pub fn for_dataset_name(name: &str, path: impl Into<PathBuf>) -> Result<Self, IngestError> {
        Ok(ImportJob::new(Dataset::from_name(name)?, path))
    }

    /// Run the import. On any error the previous table contents are intact:
    /// failures happen before `replace`, and `replace` itself is atomic.
    pub fn run<F>(&self, store: &mut TableStore, mut on_progress: F) -> Result<ImportOutcome, IngestError>
    where
        F: FnMut(ImportProgress),
    {
        on_progress(ImportProgress::Started);
        info!(dataset = %self.dataset, file = %self.path.display(), "import started");

        let bytes = read_file(&self.path)?;
        let table = normalize(&bytes, self.dataset)?;
        on_progress(ImportProgress::Normalized { rows: table.len() });

        let outcome = if table.is_empty() {
            info!(
                dataset = %self.dataset,
                rows_read = table.rows_read,
                "import file held no valid rows, table left unchanged"
            );
            ImportOutcome::NoValidRows {
                dataset: self.dataset,
            }
        } else {
            let rows = store.replace(self.dataset, &table.records)?;
            info!(
                dataset = %self.dataset,
                rows,
                dropped = table.rows_dropped,
                "import completed"
            );
            ImportOutcome::Imported {
                dataset: self.dataset,
                rows,
                imported_at: table.imported_at,
            }
        };

        on_progress(ImportProgress::Completed);
        Ok(outcome)
    }

    /// Run and fold the result into a success flag + user-facing message
    pub fn execute<F>(&self, store: &mut TableStore, on_progress: F) -> ImportStatus
    where
        F: FnMut(ImportProgress),
    {
        match self.run(store, on_progress) {
            Ok(outcome) => ImportStatus {
                success: outcome.is_imported(),
                message: outcome.message().to_string(),
            },
            Err(e) => {
                error!(dataset = %self.dataset, file = %self.path.display(), error = %e, "import failed");
                ImportStatus {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, IngestError> {
    fs::read(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// TESTS
// ============================================================================
