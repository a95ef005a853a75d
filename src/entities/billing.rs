// 💳 Billing line (faturamento_geral / faturamento_convenio)
// One line item of a billing guide. Both billing datasets share the fields
// used here; `plan` only exists in the private-insurer extract.

use super::{contains_ignore_case, is_public_insurer};
use crate::parser::Record;
use chrono::NaiveDateTime;
use serde::Serialize;

const HEMODIALYSIS_GROUP: &str = "Hemodiálise";
const HEMODIALYSIS_SERVICE: &str = "HEMODIÁLISE";
const EXTRA_SERVICE: &str = "EXTRA";

/// Dialysis session flavour derived from the service description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionKind {
    Regular,
    Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingLine {
    pub payer: String,
    pub date: Option<NaiveDateTime>,
    pub name: String,
    pub registration: String,
    pub guide_number: String,
    pub batch: String,
    pub service: String,
    pub group: String,
    pub quantity: f64,
    pub total: f64,
    pub treatment_program: String,
    pub plan: String,
}

impl BillingLine {
    pub fn from_record(record: &Record) -> Self {
        BillingLine {
            payer: record.text("convenio").to_string(),
            date: record.date("data"),
            name: record.name().to_string(),
            registration: record.text("matricula").to_string(),
            // Guide numbers are compared as normalized text, never as numbers
            guide_number: record.text("numero_guia").trim().to_string(),
            batch: record.text("lote").to_string(),
            service: record.text("servico_material").to_string(),
            group: record.text("grupo").to_string(),
            quantity: record.number("quant"),
            total: record.number("total"),
            treatment_program: record.text("programa_tratamento").to_string(),
            plan: record.text("plano").to_string(),
        }
    }

    pub fn is_public_insurer(&self) -> bool {
        is_public_insurer(&self.payer)
    }

    /// Soft key used to drop repeated line items
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.name.clone(),
            self.guide_number.clone(),
            self.service.clone(),
        )
    }

    pub fn is_hemodialysis_group(&self) -> bool {
        contains_ignore_case(&self.group, HEMODIALYSIS_GROUP)
    }

    /// Regular vs extra dialysis session; `None` for any other service
    pub fn session_kind(&self) -> Option<SessionKind> {
        if !contains_ignore_case(&self.service, HEMODIALYSIS_SERVICE) {
            return None;
        }
        if contains_ignore_case(&self.service, EXTRA_SERVICE) {
            Some(SessionKind::Extra)
        } else {
            Some(SessionKind::Regular)
        }
    }
}
