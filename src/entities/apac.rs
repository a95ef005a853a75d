// 📄 APAC authorization (laudos_apac)
// One procedure authorization per row; the APAC number doubles as the
// billing guide number for hemodialysis sessions.

use super::contains_ignore_case;
use crate::parser::Record;
use chrono::NaiveDateTime;
use serde::Serialize;

const HEMODIALYSIS_PROCEDURE: &str = "Hemodiálise";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaudoApac {
    pub name: String,
    pub procedure: String,
    pub situation: String,
    pub exit_date: Option<NaiveDateTime>,
    pub apac_number: String,
    pub final_date: Option<NaiveDateTime>,
}

impl LaudoApac {
    pub fn from_record(record: &Record) -> Self {
        LaudoApac {
            name: record.name().to_string(),
            procedure: record.text("tratamento_procedimento").to_string(),
            situation: record.text("situacao").to_string(),
            exit_date: record.date("data_saida"),
            apac_number: record.text("n_apac").trim().to_string(),
            final_date: record.date("final"),
        }
    }

    pub fn is_hemodialysis(&self) -> bool {
        contains_ignore_case(&self.procedure, HEMODIALYSIS_PROCEDURE)
    }

    /// Short situation label used in exit columns
    pub fn situation_abbreviation(&self) -> &str {
        match self.situation.as_str() {
            "Transferência de centro" => "Transf.",
            "Transplante" => "Transp.",
            other => other,
        }
    }
}
