// ✏️ Remarcações - rescheduled session review
// Advisory data shown before closing the month; lookup failures degrade to
// zero / an empty table instead of failing the caller.

use crate::db::TableStore;
use crate::entities::SessionCount;
use crate::presentation::{Cell, PresentationTable};
use crate::reconciliation::load;
use crate::schema::Dataset;
use tracing::warn;

const RESCHEDULED_COLUMN: &str = "hd_remarcadas";

/// Sum of rescheduled sessions across all patients
pub fn rescheduled_total(store: &TableStore) -> i64 {
    store
        .sum_integer(Dataset::SessoesHd, RESCHEDULED_COLUMN)
        .unwrap_or_else(|e| {
            warn!(error = %e, "rescheduled session total unavailable");
            0
        })
}

/// Patients with at least one rescheduled session
pub fn rescheduled_table(store: &TableStore) -> PresentationTable {
    let mut table = PresentationTable::new(&["Nome", "HD Normais", "HD Extras", "HD Remarcadas"]);

    let counts = match load(store, Dataset::SessoesHd, SessionCount::from_record) {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "rescheduled session table unavailable");
            return PresentationTable::default();
        }
    };

    for count in counts.iter().filter(|c| c.has_rescheduled()) {
        table.push_row(vec![
            Cell::text(&count.name),
            Cell::Int(count.regular),
            Cell::Int(count.extra),
            Cell::Int(count.rescheduled),
        ]);
    }
    table
}
