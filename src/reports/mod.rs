// 📋 Report Aggregator - one concrete type per report kind
//
// Every report follows the same pipeline:
//   required datasets present? → get_data → filter → summarize → to_table
//
// `Report` carries the per-kind steps with a typed row; `ReportGenerator` is
// the object-safe face used by the registry, blanket-implemented for every
// `Report`. `ReportKind` is the closed registry (name → implementation).

pub mod census;
pub mod continuity;
pub mod convenio;
pub mod corrections;
pub mod fistulas;

pub use census::{CensusReport, CensusView};
pub use continuity::{ContinuityCutoff, ContinuityReport};
pub use convenio::ConvenioReport;
pub use corrections::{rescheduled_table, rescheduled_total};
pub use fistulas::FistulasReport;

use crate::db::TableStore;
use crate::error::ReportError;
use crate::export::{Branding, ExportFormat, ExportRequest, ExportSink};
use crate::presentation::{LayoutHints, PresentationTable, Summary};
use crate::schema::Dataset;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::info;

const DEFAULT_CLINIC_LABEL: &str = "Clínica";

// ============================================================================
// PARAMETERS
// ============================================================================

/// Reference month of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    month: u32,
    year: i32,
    #[serde(skip)]
    start: NaiveDate,
    #[serde(skip)]
    next_start: NaiveDate,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self, ReportError> {
        let invalid = || ReportError::InvalidPeriod { month, year };
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_start = start.checked_add_months(Months::new(1)).ok_or_else(invalid)?;
        Ok(Period {
            month,
            year,
            start,
            next_start,
        })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn contains(&self, date: &NaiveDateTime) -> bool {
        date.month() == self.month && date.year() == self.year
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next_start.pred_opt().unwrap_or(self.start)
    }

    pub fn first_day_of_next_month(&self) -> NaiveDate {
        self.next_start
    }

    /// "03.2024"
    pub fn label(&self) -> String {
        format!("{:02}.{}", self.month, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportParams {
    pub clinic: Option<String>,
    pub period: Period,
}

impl ReportParams {
    pub fn new(clinic: Option<&str>, month: u32, year: i32) -> Result<Self, ReportError> {
        Ok(ReportParams {
            clinic: clinic
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            period: Period::new(month, year)?,
        })
    }

    /// Clinic name for titles, a generic label when none was given
    pub fn clinic_label(&self) -> &str {
        self.clinic.as_deref().unwrap_or(DEFAULT_CLINIC_LABEL)
    }
}

// ============================================================================
// REPORT CONTRACT
// ============================================================================

pub trait Report {
    type Row;

    fn kind(&self) -> ReportKind;
    fn title(&self) -> String;
    fn sheet_name(&self) -> &'static str;

    /// Datasets that must hold data before `get_data` runs
    fn required_datasets(&self) -> &'static [Dataset];

    /// Clinic whose logo brands the export; `None` uses the default logo
    fn clinic(&self) -> Option<&str>;

    fn get_data(&self, store: &TableStore) -> Result<Vec<Self::Row>, ReportError>;

    fn filter(&self, rows: Vec<Self::Row>) -> Vec<Self::Row> {
        rows
    }

    fn summarize(&self, rows: &[Self::Row]) -> Summary;
    fn to_table(&self, rows: &[Self::Row]) -> PresentationTable;

    fn layout(&self) -> LayoutHints {
        LayoutHints::portrait()
    }
}

/// Finished report, ready for preview or export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedReport {
    pub kind: ReportKind,
    pub title: String,
    pub sheet_name: String,
    pub table: PresentationTable,
    pub summary: Summary,
    pub layout: LayoutHints,
}

pub trait ReportGenerator {
    fn kind(&self) -> ReportKind;
    fn title(&self) -> String;

    /// Fails with `MissingUpstreamData` naming every empty required dataset
    fn check_upstream(&self, store: &TableStore) -> Result<(), ReportError>;

    fn render(&self, store: &TableStore) -> Result<RenderedReport, ReportError>;

    /// Render and hand the result to `sink`. The format is validated before
    /// anything is read, and an empty report is an error.
    fn export(
        &self,
        store: &TableStore,
        sink: &dyn ExportSink,
        format: &str,
        path: &Path,
        branding: &Branding,
    ) -> Result<RenderedReport, ReportError>;
}

impl<R: Report> ReportGenerator for R {
    fn kind(&self) -> ReportKind {
        Report::kind(self)
    }

    fn title(&self) -> String {
        Report::title(self)
    }

    fn check_upstream(&self, store: &TableStore) -> Result<(), ReportError> {
        let mut missing = Vec::new();
        for dataset in self.required_datasets() {
            if !store.has_data(*dataset)? {
                missing.push(*dataset);
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReportError::MissingUpstreamData { datasets: missing })
        }
    }

    fn render(&self, store: &TableStore) -> Result<RenderedReport, ReportError> {
        self.check_upstream(store)?;

        let rows = self.filter(self.get_data(store)?);
        let summary = self.summarize(&rows);
        let table = self.to_table(&rows);

        info!(report = %Report::kind(self), rows = table.len(), "report rendered");

        Ok(RenderedReport {
            kind: Report::kind(self),
            title: Report::title(self),
            sheet_name: self.sheet_name().to_string(),
            table,
            summary,
            layout: self.layout(),
        })
    }

    fn export(
        &self,
        store: &TableStore,
        sink: &dyn ExportSink,
        format: &str,
        path: &Path,
        branding: &Branding,
    ) -> Result<RenderedReport, ReportError> {
        let format = ExportFormat::parse(format)?;
        let report = self.render(store)?;

        if report.table.is_empty() {
            return Err(ReportError::NoData {
                title: report.title,
            });
        }

        let request = ExportRequest {
            title: &report.title,
            sheet_name: &report.sheet_name,
            logo: branding.logo_for(self.clinic()),
            layout: &report.layout,
            table: &report.table,
            summary: &report.summary,
            format,
        };
        sink.write(&request, path)?;

        Ok(report)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportKind {
    Geral,
    Entrada,
    Saida,
    Fistulas,
    Continuidade,
    GeralConvenio,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Geral,
        ReportKind::Entrada,
        ReportKind::Saida,
        ReportKind::Fistulas,
        ReportKind::Continuidade,
        ReportKind::GeralConvenio,
    ];

    /// Registry name
    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::Geral => "Geral",
            ReportKind::Entrada => "Entrada",
            ReportKind::Saida => "Saída",
            ReportKind::Fistulas => "Fístulas",
            ReportKind::Continuidade => "Continuidade",
            ReportKind::GeralConvenio => "Geral Convênio",
        }
    }

    /// Exact registry name, or a case/accent-insensitive spelling of it
    /// ("saida", "geral_convenio")
    pub fn from_name(name: &str) -> Result<Self, ReportError> {
        let wanted = fold(name);
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name || fold(kind.name()) == wanted)
            .ok_or_else(|| ReportError::UnknownReport(name.to_string()))
    }

    pub fn build(&self, params: ReportParams) -> Box<dyn ReportGenerator> {
        match self {
            ReportKind::Geral => Box::new(CensusReport::new(CensusView::Geral, params)),
            ReportKind::Entrada => Box::new(CensusReport::new(CensusView::Entrada, params)),
            ReportKind::Saida => Box::new(CensusReport::new(CensusView::Saida, params)),
            ReportKind::Fistulas => Box::new(FistulasReport::new(params)),
            ReportKind::Continuidade => Box::new(ContinuityReport::new(params)),
            ReportKind::GeralConvenio => Box::new(ConvenioReport),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up a report by name and build it
pub fn build_report(name: &str, params: ReportParams) -> Result<Box<dyn ReportGenerator>, ReportError> {
    Ok(ReportKind::from_name(name)?.build(params))
}

fn fold(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            '_' | '-' => ' ',
            other => other,
        })
        .collect()
}

// ============================================================================
// REPORT GROUPS
// ============================================================================

/// A closing workflow: what to import, which corrections to review, which
/// reports to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportGroup {
    pub name: &'static str,
    pub imports: &'static [Dataset],
    pub corrections: &'static [&'static str],
    pub exports: &'static [ReportKind],
}

pub const REPORT_GROUPS: &[ReportGroup] = &[
    ReportGroup {
        name: "Relatório de Fechamento SUS",
        imports: &[
            Dataset::LaudosApac,
            Dataset::FaturamentoGeral,
            Dataset::SessoesHd,
            Dataset::EstatisticaMensal,
            Dataset::EventosCateter,
        ],
        corrections: &["Remarcações"],
        exports: &[
            ReportKind::Geral,
            ReportKind::Entrada,
            ReportKind::Saida,
            ReportKind::Fistulas,
            ReportKind::Continuidade,
        ],
    },
    ReportGroup {
        name: "Relatório de Faturamento Convênio",
        imports: &[Dataset::FaturamentoConvenio],
        corrections: &[],
        exports: &[ReportKind::GeralConvenio],
    },
];

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::parser::normalize_at;

    /// Import `rows` (banner added) into `dataset`
    pub(crate) fn seed(store: &mut TableStore, dataset: Dataset, rows: &[String]) {
        let text = format!("banner\n{}\n", rows.join("\n"));
        let imported_at = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        // Import files are Latin-1; encode the fixture the same way
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&text);
        let table = normalize_at(&bytes, dataset, imported_at).unwrap();
        store.replace(dataset, &table.records).unwrap();
    }

    /// Positional row with the given (column, value) pairs, other cells empty
    pub(crate) fn row(dataset: Dataset, cells: &[(&str, &str)]) -> String {
        let schema = dataset.schema();
        let mut values = vec![""; schema.raw_column_count()];
        for (column, value) in cells {
            values[schema.raw_index(column).unwrap()] = *value;
        }
        values.join(";")
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(12, 2024).is_ok());
        assert!(matches!(
            Period::new(13, 2024),
            Err(ReportError::InvalidPeriod { month: 13, year: 2024 })
        ));
        assert!(Period::new(0, 2024).is_err());
    }

    #[test]
    fn test_period_bounds() {
        let feb = Period::new(2, 2024).unwrap();
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(feb.first_day_of_next_month(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(feb.label(), "02.2024");

        let dec = Period::new(12, 2023).unwrap();
        assert_eq!(dec.first_day_of_next_month(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_clinic_label() {
        let none = ReportParams::new(None, 3, 2024).unwrap();
        assert_eq!(none.clinic_label(), "Clínica");

        let blank = ReportParams::new(Some("  "), 3, 2024).unwrap();
        assert_eq!(blank.clinic, None);

        let cnn = ReportParams::new(Some("CNN"), 3, 2024).unwrap();
        assert_eq!(cnn.clinic_label(), "CNN");
    }

    #[test]
    fn test_registry_names() {
        for kind in ReportKind::ALL {
            assert_eq!(ReportKind::from_name(kind.name()).unwrap(), kind);
        }
        assert_eq!(ReportKind::from_name("saida").unwrap(), ReportKind::Saida);
        assert_eq!(ReportKind::from_name("FISTULAS").unwrap(), ReportKind::Fistulas);
        assert_eq!(
            ReportKind::from_name("geral_convenio").unwrap(),
            ReportKind::GeralConvenio
        );

        let err = ReportKind::from_name("Mensal").unwrap_err();
        assert_eq!(err.to_string(), "unknown report 'Mensal'");
    }

    #[test]
    fn test_every_grouped_report_is_registered() {
        let grouped: Vec<ReportKind> = REPORT_GROUPS
            .iter()
            .flat_map(|g| g.exports.iter().copied())
            .collect();
        assert_eq!(grouped.len(), ReportKind::ALL.len());
        for kind in ReportKind::ALL {
            assert!(grouped.contains(&kind));
        }
    }

    #[test]
    fn test_missing_upstream_names_all_empty_datasets() {
        let mut store = TableStore::open_in_memory().unwrap();
        seed(
            &mut store,
            Dataset::LaudosApac,
            &[row(Dataset::LaudosApac, &[("nome", "Maria Silva")])],
        );

        let params = ReportParams::new(Some("CNN"), 3, 2024).unwrap();
        let report = ReportKind::Geral.build(params);

        match report.render(&store) {
            Err(ReportError::MissingUpstreamData { datasets }) => assert_eq!(
                datasets,
                vec![
                    Dataset::EstatisticaMensal,
                    Dataset::EventosCateter,
                    Dataset::FaturamentoGeral
                ]
            ),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_format_fails_before_reading() {
        // Empty store: a format error must win over missing data
        let store = TableStore::open_in_memory().unwrap();
        let params = ReportParams::new(None, 3, 2024).unwrap();
        let report = ReportKind::Continuidade.build(params);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");

        let err = report
            .export(&store, &crate::export::FileExportSink, "docx", &path, &Branding::default())
            .unwrap_err();

        assert!(matches!(err, ReportError::Export(crate::error::ExportError::Unsupported(_))));
        assert!(!path.exists());
    }
}
