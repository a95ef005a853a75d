// 🔁 Continuidade - hemodialysis APACs still valid after the period

use super::{Report, ReportKind, ReportParams};
use crate::db::TableStore;
use crate::entities::LaudoApac;
use crate::error::ReportError;
use crate::format::format_optional_date;
use crate::presentation::{Cell, PresentationTable, Summary};
use crate::reconciliation::load;
use crate::schema::Dataset;
use chrono::NaiveDateTime;
use serde::Serialize;

const REQUIRED: &[Dataset] = &[Dataset::LaudosApac];

/// Where "after the period" starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ContinuityCutoff {
    /// Final date strictly after the last day of the month at 00:00, so an
    /// APAC ending later that same day still counts
    #[default]
    LastDayOfMonth,
    /// Final date on or after the first day of the next month
    PeriodEnd,
}

pub struct ContinuityReport {
    params: ReportParams,
    cutoff: ContinuityCutoff,
}

impl ContinuityReport {
    pub fn new(params: ReportParams) -> Self {
        Self::with_cutoff(params, ContinuityCutoff::default())
    }

    pub fn with_cutoff(params: ReportParams, cutoff: ContinuityCutoff) -> Self {
        ContinuityReport { params, cutoff }
    }

    fn continues(&self, final_date: &NaiveDateTime) -> bool {
        let period = &self.params.period;
        let boundary = match self.cutoff {
            ContinuityCutoff::LastDayOfMonth => period.last_day(),
            ContinuityCutoff::PeriodEnd => period.first_day_of_next_month(),
        };
        let Some(midnight) = boundary.and_hms_opt(0, 0, 0) else {
            return false;
        };

        match self.cutoff {
            ContinuityCutoff::LastDayOfMonth => *final_date > midnight,
            ContinuityCutoff::PeriodEnd => *final_date >= midnight,
        }
    }
}

impl Report for ContinuityReport {
    type Row = LaudoApac;

    fn kind(&self) -> ReportKind {
        ReportKind::Continuidade
    }

    fn title(&self) -> String {
        format!(
            "Continuidade - {} - {}",
            self.params.clinic_label(),
            self.params.period.label()
        )
    }

    fn sheet_name(&self) -> &'static str {
        "Continuidade"
    }

    fn required_datasets(&self) -> &'static [Dataset] {
        REQUIRED
    }

    fn clinic(&self) -> Option<&str> {
        self.params.clinic.as_deref()
    }

    fn get_data(&self, store: &TableStore) -> Result<Vec<LaudoApac>, ReportError> {
        let mut rows: Vec<LaudoApac> = load(store, Dataset::LaudosApac, LaudoApac::from_record)?
            .into_iter()
            .filter(|a| a.is_hemodialysis())
            .filter(|a| a.final_date.as_ref().is_some_and(|d| self.continues(d)))
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    fn summarize(&self, rows: &[LaudoApac]) -> Summary {
        Summary::new().int("Total de Pacientes em Continuidade", rows.len() as i64)
    }

    fn to_table(&self, rows: &[LaudoApac]) -> PresentationTable {
        let mut table = PresentationTable::new(&["Nome", "Nº APAC", "Final"]);
        for apac in rows {
            table.push_row(vec![
                Cell::text(&apac.name),
                Cell::text(&apac.apac_number),
                Cell::text(format_optional_date(apac.final_date.as_ref())),
            ]);
        }
        table
    }
}
