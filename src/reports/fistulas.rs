// 🩸 Fístulas - classified vascular access procedures

use super::{Report, ReportKind, ReportParams};
use crate::db::TableStore;
use crate::error::ReportError;
use crate::presentation::{Cell, LayoutHints, PresentationTable, Summary};
use crate::reconciliation::{assemble_procedures, ProcedureRow};
use crate::rules::{ProcedureCategory, RuleEngine};
use crate::schema::Dataset;
use std::collections::HashMap;

const REQUIRED: &[Dataset] = &[Dataset::EventosCateter, Dataset::LaudosApac];

pub struct FistulasReport {
    params: ReportParams,
    engine: RuleEngine,
}

impl FistulasReport {
    pub fn new(params: ReportParams) -> Self {
        Self::with_engine(params, RuleEngine::standard())
    }

    pub fn with_engine(params: ReportParams, engine: RuleEngine) -> Self {
        FistulasReport { params, engine }
    }
}

/// Per-category counts, most frequent first (ties by label)
fn category_counts(rows: &[ProcedureRow]) -> Vec<(ProcedureCategory, usize)> {
    let mut counts: HashMap<ProcedureCategory, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.category).or_default() += 1;
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.label().cmp(b.0.label())));
    counts
}

impl Report for FistulasReport {
    type Row = ProcedureRow;

    fn kind(&self) -> ReportKind {
        ReportKind::Fistulas
    }

    fn title(&self) -> String {
        format!("Fístulas - {}", self.params.clinic_label())
    }

    fn sheet_name(&self) -> &'static str {
        "Procedimentos FAV"
    }

    fn required_datasets(&self) -> &'static [Dataset] {
        REQUIRED
    }

    fn clinic(&self) -> Option<&str> {
        self.params.clinic.as_deref()
    }

    fn get_data(&self, store: &TableStore) -> Result<Vec<ProcedureRow>, ReportError> {
        let mut rows = assemble_procedures(store, &self.engine)?;
        rows.sort_by(|a, b| {
            a.category
                .label()
                .cmp(b.category.label())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }

    fn summarize(&self, rows: &[ProcedureRow]) -> Summary {
        if rows.is_empty() {
            return Summary::new();
        }

        category_counts(rows).into_iter().fold(
            Summary::new().int("Total Geral de Procedimentos", rows.len() as i64),
            |summary, (category, count)| summary.int(format!("Total de {}", category.label()), count as i64),
        )
    }

    fn to_table(&self, rows: &[ProcedureRow]) -> PresentationTable {
        let mut table = PresentationTable::new(&["Nome", "Nº APAC", "Fístula"]);
        for row in rows {
            table.push_row(vec![
                Cell::text(&row.name),
                Cell::text(&row.apac_number),
                Cell::text(row.category.label()),
            ]);
        }
        table
    }

    fn layout(&self) -> LayoutHints {
        LayoutHints::portrait().with_summary_heading("RESUMO DE PROCEDIMENTOS")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::SummaryValue;
    use crate::reports::tests::{row, seed};
    use crate::reports::ReportGenerator;

    fn event(name: &str, evento: &str, tipo: &str, convenio: &str) -> String {
        row(
            Dataset::EventosCateter,
            &[
                ("nome", name),
                ("acesso", "Cateter"),
                ("evento", evento),
                ("tipo", tipo),
                ("convenio", convenio),
            ],
        )
    }

    fn seeded_store() -> TableStore {
        let mut store = TableStore::open_in_memory().unwrap();
        seed(
            &mut store,
            Dataset::EventosCateter,
            &[
                event("Rita Alves", "Colocação", "Longa Perm. HD", "SUS"),
                event("Ana Lima", "Colocação", "Longa Perm. HD", "SUS"),
                event("Maria Silva", "Confecção", "Autógena", "SUS"),
                event("Jose Souza", "Colocação", "Longa Perm. HD", "Particular"),
                event("Jose Souza", "Colocação", "Duplo Lumen HD", "SUS"),
            ],
        );
        let apac = |name: &str, number: &str| {
            row(Dataset::LaudosApac, &[("nome", name), ("n_apac", number)])
        };
        seed(
            &mut store,
            Dataset::LaudosApac,
            &[apac("Ana Lima", "10"), apac("Ana Lima", "11"), apac("Maria Silva", "20")],
        );
        store
    }

    #[test]
    fn test_fistulas_report() {
        let store = seeded_store();
        let params = ReportParams::new(Some("Pronto Rim"), 3, 2024).unwrap();
        let report = FistulasReport::new(params).render(&store).unwrap();

        assert_eq!(report.title, "Fístulas - Pronto Rim");
        assert_eq!(report.sheet_name, "Procedimentos FAV");
        assert_eq!(report.layout.summary_heading, "RESUMO DE PROCEDIMENTOS");

        // Sorted by category label, then name; Outro rows are dropped
        let rows: Vec<Vec<String>> = report
            .table
            .rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["Maria Silva", "20", "Fístula"],
                vec!["Ana Lima", "11", "Permcath"],
                vec!["Rita Alves", "", "Permcath"],
            ]
        );

        assert_eq!(
            report.summary.keys(),
            vec!["Total Geral de Procedimentos", "Total de Permcath", "Total de Fístula"]
        );
        assert_eq!(report.summary.get("Total de Permcath"), Some(&SummaryValue::Int(2)));
    }

    #[test]
    fn test_requires_events_and_apacs() {
        let store = TableStore::open_in_memory().unwrap();
        let params = ReportParams::new(None, 3, 2024).unwrap();
        let err = FistulasReport::new(params).render(&store).unwrap_err();
        assert!(matches!(err, ReportError::MissingUpstreamData { ref datasets } if datasets.len() == 2));
    }
}
