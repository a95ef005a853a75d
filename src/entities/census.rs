// 🧪 Monthly census entry (estatistica_mensal)
// Carries the admission date and the serology results of each patient.

use crate::parser::Record;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Substring marking a reactive result in the serology columns
const REACTIVE: &str = "reag";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CensusEntry {
    pub name: String,
    pub entry_date: Option<NaiveDateTime>,
    pub hep_c: String,
    pub hbsag: String,
    pub hiv: String,
}

impl CensusEntry {
    pub fn from_record(record: &Record) -> Self {
        CensusEntry {
            name: record.name().to_string(),
            entry_date: record.date("dt_entr"),
            hep_c: record.text("hep_c").to_string(),
            hbsag: record.text("hbsag").to_string(),
            hiv: record.text("hiv").to_string(),
        }
    }

    pub fn serology(&self) -> SerologyMarkers {
        SerologyMarkers {
            hbv: is_reactive(&self.hbsag),
            hcv: is_reactive(&self.hep_c),
            hiv: is_reactive(&self.hiv),
        }
    }
}

fn is_reactive(result: &str) -> bool {
    result.to_lowercase().contains(REACTIVE)
}

// ============================================================================
// SEROLOGY MARKERS
// ============================================================================

/// Compact marker set rendered as e.g. "HBV, HIV"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SerologyMarkers {
    pub hbv: bool,
    pub hcv: bool,
    pub hiv: bool,
}

impl SerologyMarkers {
    pub fn is_empty(&self) -> bool {
        !(self.hbv || self.hcv || self.hiv)
    }

    pub fn labels(&self) -> Vec<&'static str> {
        [(self.hbv, "HBV"), (self.hcv, "HCV"), (self.hiv, "HIV")]
            .into_iter()
            .filter_map(|(set, label)| set.then_some(label))
            .collect()
    }
}

impl fmt::Display for SerologyMarkers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.labels().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hbsag: &str, hep_c: &str, hiv: &str) -> CensusEntry {
        CensusEntry {
            name: "Maria Silva".to_string(),
            entry_date: None,
            hep_c: hep_c.to_string(),
            hbsag: hbsag.to_string(),
            hiv: hiv.to_string(),
        }
    }

    #[test]
    fn test_serology_markers_order() {
        let markers = entry("Reagente", "", "REAGENTE").serology();
        assert_eq!(markers.to_string(), "HBV, HIV");
        assert!(!markers.is_empty());
    }

    #[test]
    fn test_no_markers() {
        let markers = entry("", "Negativo", "").serology();
        assert!(markers.is_empty());
        assert_eq!(markers.to_string(), "");
    }

    #[test]
    fn test_reactive_is_a_plain_substring_match() {
        // "Não reagente" still contains the marker substring
        assert!(entry("Não reagente", "", "").serology().hbv);
    }
}
