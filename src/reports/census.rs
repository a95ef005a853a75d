// 🏥 Census reports - Geral / Entrada / Saída
// Three views over the same assembled census. For a fixed period each row
// lands in exactly one view:
//   Saída   → has an exit label
//   Entrada → no exit, admitted within the period
//   Geral   → no exit, admitted outside the period (or never dated)

use super::{Report, ReportKind, ReportParams};
use crate::db::TableStore;
use crate::error::ReportError;
use crate::format::format_optional_date;
use crate::presentation::{Cell, LayoutHints, PresentationTable, Summary};
use crate::reconciliation::{assemble_census, CensusRow};
use crate::schema::Dataset;
use serde::Serialize;

const REQUIRED: &[Dataset] = &[
    Dataset::LaudosApac,
    Dataset::EstatisticaMensal,
    Dataset::EventosCateter,
    Dataset::FaturamentoGeral,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CensusView {
    Geral,
    Entrada,
    Saida,
}

impl CensusView {
    /// Bucket a single row falls into for `params`' period
    pub fn of(row: &CensusRow, params: &ReportParams) -> CensusView {
        if row.has_exit() {
            CensusView::Saida
        } else if row
            .entry_date
            .as_ref()
            .is_some_and(|d| params.period.contains(d))
        {
            CensusView::Entrada
        } else {
            CensusView::Geral
        }
    }
}

pub struct CensusReport {
    view: CensusView,
    params: ReportParams,
}

impl CensusReport {
    pub fn new(view: CensusView, params: ReportParams) -> Self {
        CensusReport { view, params }
    }

    pub fn view(&self) -> CensusView {
        self.view
    }
}

impl Report for CensusReport {
    type Row = CensusRow;

    fn kind(&self) -> ReportKind {
        match self.view {
            CensusView::Geral => ReportKind::Geral,
            CensusView::Entrada => ReportKind::Entrada,
            CensusView::Saida => ReportKind::Saida,
        }
    }

    fn title(&self) -> String {
        let prefix = match self.view {
            CensusView::Geral => "Geral",
            CensusView::Entrada => "Entradas",
            CensusView::Saida => "Saídas",
        };
        format!(
            "{prefix} - {} - {}",
            self.params.clinic_label(),
            self.params.period.label()
        )
    }

    fn sheet_name(&self) -> &'static str {
        match self.view {
            CensusView::Geral => "Geral",
            CensusView::Entrada => "Entradas",
            CensusView::Saida => "Saídas",
        }
    }

    fn required_datasets(&self) -> &'static [Dataset] {
        REQUIRED
    }

    fn clinic(&self) -> Option<&str> {
        self.params.clinic.as_deref()
    }

    fn get_data(&self, store: &TableStore) -> Result<Vec<CensusRow>, ReportError> {
        Ok(assemble_census(store)?)
    }

    fn filter(&self, rows: Vec<CensusRow>) -> Vec<CensusRow> {
        rows.into_iter()
            .filter(|row| CensusView::of(row, &self.params) == self.view)
            .collect()
    }

    fn summarize(&self, rows: &[CensusRow]) -> Summary {
        let hd: i64 = rows.iter().map(|r| r.regular_sessions).sum();
        let extras: i64 = rows.iter().map(|r| r.extra_sessions).sum();
        let cdl = rows.iter().filter(|r| r.cdl).count() as i64;
        let patients = rows.len() as i64;

        let summary = match self.view {
            CensusView::Entrada => Summary::new()
                .int("Total de Pacientes na Listagem", patients)
                .int("Total de Sessões HD", hd)
                .int("Total de Sessões Extras", extras)
                .int("Total de Sessões (HD + Extras)", hd + extras)
                .int("Total de Colocações de CDL (SUS)", cdl),
            CensusView::Geral | CensusView::Saida => Summary::new()
                .int("Pacientes na Listagem", patients)
                .int("Sessões Totais", hd + extras)
                .int("Sessões HD", hd)
                .int("Sessões Extras", extras)
                .int("Colocações de CDL", cdl),
        };

        summary
            .int("Total HBV", rows.iter().filter(|r| r.serology.hbv).count() as i64)
            .int("Total HCV", rows.iter().filter(|r| r.serology.hcv).count() as i64)
            .int("Total HIV", rows.iter().filter(|r| r.serology.hiv).count() as i64)
    }

    fn to_table(&self, rows: &[CensusRow]) -> PresentationTable {
        let columns: &[&str] = match self.view {
            CensusView::Geral => &["Nome", "Nº APAC", "HD", "Extras", "CDL", "Observação"],
            CensusView::Entrada => &["Nome", "Nº APAC", "HD", "Extras", "CDL", "Entrada", "Observação"],
            CensusView::Saida => &["Nome", "Nº APAC", "HD", "Extras", "CDL", "Saída", "Observação"],
        };

        let mut table = PresentationTable::new(columns);
        for row in rows {
            let mut cells = vec![
                Cell::text(&row.name),
                Cell::text(&row.apac_number),
                Cell::int_or_blank(row.regular_sessions),
                Cell::int_or_blank(row.extra_sessions),
                Cell::text(row.cdl_label()),
            ];
            match self.view {
                CensusView::Geral => {}
                CensusView::Entrada => cells.push(Cell::text(format_optional_date(row.entry_date.as_ref()))),
                CensusView::Saida => cells.push(Cell::text(&row.exit_label)),
            }
            cells.push(Cell::text(row.serology.to_string()));
            table.push_row(cells);
        }
        table
    }

    fn layout(&self) -> LayoutHints {
        let widths: &[&str] = match self.view {
            CensusView::Geral => &["30%", "20%", "7%", "10%", "7%", "26%"],
            CensusView::Entrada => &["28%", "15%", "7%", "9%", "9%", "10%", "22%"],
            CensusView::Saida => &["28%", "15%", "7%", "8%", "7%", "12%", "23%"],
        };
        LayoutHints::portrait().with_widths(widths)
    }
}

// ============================================================================
// TESTS
// ============================================================================
