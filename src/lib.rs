// Dialysis Reports - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod schema;         // Schema Registry - dataset column layouts
pub mod parser;         // Ingestion Normalizer - delimited extract → typed records
pub mod db;             // Table Store - one SQLite table per dataset
pub mod importer;       // Import Job - normalize + replace with progress
pub mod deduplication;  // Soft-key duplicate removal
pub mod entities;       // Typed views over stored records
pub mod rules;          // Procedure classification rules
pub mod reconciliation; // Cross-dataset joins
pub mod aggregation;    // Billing aggregation per guide
pub mod format;         // pt-BR currency/date formatting
pub mod presentation;   // Tables and summaries handed to sinks
pub mod reports;        // Report registry and concrete reports
pub mod export;         // Export formats, branding and file sinks
pub mod config;         // TOML configuration
pub mod error;          // Error taxonomy

// Re-export commonly used types
pub use schema::{get_schema, ColumnKind, Dataset, DatasetSchema};
pub use parser::{normalize, normalize_at, NormalizedTable, Record, Value};
pub use db::{ImportInfo, TableStore};
pub use importer::{ImportJob, ImportOutcome, ImportProgress, ImportStatus};
pub use entities::{
    BillingLine, CatheterEvent, CensusEntry, LaudoApac, SerologyMarkers, SessionCount, SessionKind,
};
pub use rules::{classify, ClassificationResult, ClassificationRule, ProcedureCategory, RuleEngine};
pub use reconciliation::{assemble_census, CensusRow, ProcedureRow};
pub use aggregation::{aggregate_by_guide, summarize_billing, BillingSummary, GuideAggregate};
pub use presentation::{Cell, LayoutHints, Orientation, PresentationTable, Summary, SummaryValue};
pub use reports::{
    build_report, Period, RenderedReport, Report, ReportGenerator, ReportGroup, ReportKind,
    ReportParams, REPORT_GROUPS,
};
pub use export::{Branding, ExportFormat, ExportRequest, ExportSink, FileExportSink};
pub use config::AppConfig;
pub use error::{ExportError, IngestError, ReportError, SchemaError, StoreError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
