// 💼 Geral Convênio - private-insurer billing per guide
// Rows are the raw billing lines; the table collapses them per guide number
// while the summary is computed over the raw lines themselves.

use super::{Report, ReportKind};
use crate::aggregation::{aggregate_by_guide, summarize_billing};
use crate::db::TableStore;
use crate::entities::BillingLine;
use crate::error::ReportError;
use crate::format::{format_brl, format_optional_date};
use crate::presentation::{Cell, LayoutHints, PresentationTable, Summary};
use crate::reconciliation::load;
use crate::schema::Dataset;

const REQUIRED: &[Dataset] = &[Dataset::FaturamentoConvenio];

/// Covers the whole imported extract; takes no period
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvenioReport;

impl Report for ConvenioReport {
    type Row = BillingLine;

    fn kind(&self) -> ReportKind {
        ReportKind::GeralConvenio
    }

    fn title(&self) -> String {
        "Relatório Geral de Faturamento Convênio".to_string()
    }

    fn sheet_name(&self) -> &'static str {
        "Geral Convenio"
    }

    fn required_datasets(&self) -> &'static [Dataset] {
        REQUIRED
    }

    /// Always branded with the default logo
    fn clinic(&self) -> Option<&str> {
        None
    }

    fn get_data(&self, store: &TableStore) -> Result<Vec<BillingLine>, ReportError> {
        Ok(load(store, Dataset::FaturamentoConvenio, BillingLine::from_record)?)
    }

    fn summarize(&self, rows: &[BillingLine]) -> Summary {
        if rows.is_empty() {
            return Summary::new();
        }

        let totals = summarize_billing(rows);
        Summary::new()
            .int("Quantidade de Guias", totals.guide_count as i64)
            .int("Quantidade Total de Sessões", totals.total_sessions.trunc() as i64)
            .int("Quantidade de Sessões HD", totals.hd_sessions.trunc() as i64)
            .int("Quantidade de Sessões HDF", totals.hdf_sessions.trunc() as i64)
            .text("Valor Total", format_brl(totals.total_amount))
    }

    fn to_table(&self, rows: &[BillingLine]) -> PresentationTable {
        let mut table = PresentationTable::new(&[
            "Nome",
            "Matrícula",
            "Número da Guia",
            "Lote",
            "Quant.",
            "Programa Tratamento",
            "Plano",
            "Total",
            "Data Início",
            "Data Final",
        ]);

        for guide in aggregate_by_guide(rows) {
            table.push_row(vec![
                Cell::text(guide.name),
                Cell::text(guide.registration),
                Cell::text(guide.guide_number),
                Cell::text(guide.batch),
                Cell::Number(guide.quantity),
                Cell::text(guide.treatment_program),
                Cell::text(guide.plan),
                Cell::text(format_brl(guide.total)),
                Cell::text(format_optional_date(guide.first_date.as_ref())),
                Cell::text(format_optional_date(guide.last_date.as_ref())),
            ]);
        }
        table
    }

    fn layout(&self) -> LayoutHints {
        LayoutHints::landscape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{Branding, FileExportSink};
    use crate::presentation::SummaryValue;
    use crate::presentation::Orientation;
    use crate::reports::tests::{row, seed};
    use crate::reports::ReportGenerator;

    fn line(name: &str, guide: &str, date: &str, quant: &str, total: &str, program: &str) -> String {
        row(
            Dataset::FaturamentoConvenio,
            &[
                ("convenio", "Unimed"),
                ("data", date),
                ("nome", name),
                ("numero_guia", guide),
                ("quant", quant),
                ("total", total),
                ("programa_tratamento", program),
                ("plano", "Enfermaria"),
            ],
        )
    }

    fn seeded_store() -> TableStore {
        let mut store = TableStore::open_in_memory().unwrap();
        seed(
            &mut store,
            Dataset::FaturamentoConvenio,
            &[
                line("Maria Silva", "G1", "12/03/2024 00:00:00", "4", "1000,50", "Hemodiálise"),
                line("Maria Silva", "G1", "02/03/2024 00:00:00", "4", "1000", "Hemodiálise"),
                line("Maria Silva", "G1", "28/03/2024 00:00:00", "5", "1250", "Hemodiálise"),
                line("Ana Lima", "G2", "05/03/2024 00:00:00", "2", "800", "Hemodiafiltração"),
            ],
        );
        store
    }

    #[test]
    fn test_guides_collapse_into_one_row() {
        let store = seeded_store();
        let report = ConvenioReport.render(&store).unwrap();

        assert_eq!(report.title, "Relatório Geral de Faturamento Convênio");
        assert_eq!(report.layout.orientation, Orientation::Landscape);
        assert_eq!(report.table.len(), 2);

        // Sorted by name: Ana first
        let maria = &report.table.rows[1];
        assert_eq!(maria[0], Cell::text("Maria Silva"));
        assert_eq!(maria[2], Cell::text("G1"));
        assert_eq!(maria[4], Cell::Number(13.0));
        assert_eq!(maria[7], Cell::text("R$ 3.250,50"));
        assert_eq!(maria[8], Cell::text("02/03/2024"));
        assert_eq!(maria[9], Cell::text("28/03/2024"));
    }

    #[test]
    fn test_summary_over_raw_lines() {
        let store = seeded_store();
        let report = ConvenioReport.render(&store).unwrap();

        assert_eq!(report.summary.get("Quantidade de Guias"), Some(&SummaryValue::Int(2)));
        assert_eq!(report.summary.get("Quantidade Total de Sessões"), Some(&SummaryValue::Int(15)));
        assert_eq!(report.summary.get("Quantidade de Sessões HD"), Some(&SummaryValue::Int(13)));
        assert_eq!(report.summary.get("Quantidade de Sessões HDF"), Some(&SummaryValue::Int(2)));
        assert_eq!(
            report.summary.get("Valor Total"),
            Some(&SummaryValue::Text("R$ 4.050,50".to_string()))
        );
    }

    #[test]
    fn test_export_uses_default_logo() {
        let store = seeded_store();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convenio.json");

        ConvenioReport
            .export(&store, &FileExportSink, "pdf", &path, &Branding::default())
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["logo"], "assets/logo.png");
        assert_eq!(json["sheet_name"], "Geral Convenio");
    }
}
