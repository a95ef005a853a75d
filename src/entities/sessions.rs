// 📅 Session count (sessoes_hd)
// Per-patient session counters exported by the scheduling system; only the
// rescheduled counter feeds the "Remarcações" correction.

use crate::parser::Record;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCount {
    pub name: String,
    pub regular: i64,
    pub extra: i64,
    pub rescheduled: i64,
}

impl SessionCount {
    pub fn from_record(record: &Record) -> Self {
        SessionCount {
            name: record.name().to_string(),
            regular: record.integer("hd_normais"),
            extra: record.integer("hd_extras"),
            rescheduled: record.integer("hd_remarcadas"),
        }
    }

    pub fn has_rescheduled(&self) -> bool {
        self.rescheduled > 0
    }
}
