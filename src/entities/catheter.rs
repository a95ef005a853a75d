// 🩺 Catheter / fistula event (eventos_cateter)

use super::{eq_ignore_case, is_public_insurer};
use crate::parser::Record;
use chrono::NaiveDateTime;
use serde::Serialize;

const PLACEMENT_EVENT: &str = "colocação";
const DOUBLE_LUMEN_TYPE: &str = "duplo lumen hd";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatheterEvent {
    pub date: Option<NaiveDateTime>,
    pub access: String,
    pub name: String,
    pub event: String,
    pub kind: String,
    pub location: String,
    pub payer: String,
    pub does_not_bill: String,
}

impl CatheterEvent {
    pub fn from_record(record: &Record) -> Self {
        CatheterEvent {
            date: record.date("data"),
            access: record.text("acesso").to_string(),
            name: record.name().to_string(),
            event: record.text("evento").to_string(),
            kind: record.text("tipo").to_string(),
            location: record.text("localizacao").to_string(),
            payer: record.text("convenio").to_string(),
            does_not_bill: record.text("nao_cobra").to_string(),
        }
    }

    /// Public-insurer event without the does-not-bill flag
    pub fn is_billable_public(&self) -> bool {
        is_public_insurer(&self.payer) && self.does_not_bill.trim().is_empty()
    }

    /// Billable placement of a double-lumen dialysis catheter (CDL)
    pub fn is_cdl_placement(&self) -> bool {
        self.is_billable_public()
            && eq_ignore_case(&self.event, PLACEMENT_EVENT)
            && eq_ignore_case(&self.kind, DOUBLE_LUMEN_TYPE)
    }
}
