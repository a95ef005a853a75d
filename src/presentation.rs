// 🧾 Presentation model - what the export sink receives
// Ordered columns, string/number cells, an ordered summary and layout hints.
// Everything here is already formatted: the sink only lays it out.

use crate::format::format_quantity;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

// ============================================================================
// CELLS + TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Number(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn empty() -> Self {
        Cell::Text(String::new())
    }

    /// Zero renders as an empty cell
    pub fn int_or_blank(value: i64) -> Self {
        if value == 0 {
            Cell::empty()
        } else {
            Cell::Int(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Number(n) => f.write_str(&format_quantity(*n)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresentationTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl PresentationTable {
    pub fn new(columns: &[&str]) -> Self {
        PresentationTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with every cell empty are not kept
    pub fn push_row(&mut self, row: Vec<Cell>) {
        if row.iter().all(Cell::is_empty) {
            return;
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// All cells of one column, in row order
    pub fn column(&self, column: &str) -> Vec<&Cell> {
        match self.column_index(column) {
            Some(i) => self.rows.iter().filter_map(|r| r.get(i)).collect(),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryValue::Int(i) => write!(f, "{i}"),
            SummaryValue::Text(s) => f.write_str(s),
        }
    }
}

/// Insertion-ordered key/value summary block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    entries: Vec<(String, SummaryValue)>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.entries.push((key.into(), SummaryValue::Int(value)));
        self
    }

    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), SummaryValue::Text(value.into())));
        self
    }

    pub fn get(&self, key: &str) -> Option<&SummaryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SummaryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ============================================================================
// LAYOUT HINTS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutHints {
    /// Relative widths ("30%") per column, empty for automatic sizing
    pub column_widths: Vec<String>,
    pub orientation: Orientation,
    pub summary_heading: String,
}

impl LayoutHints {
    pub const DEFAULT_SUMMARY_HEADING: &'static str = "RESUMO GERAL";

    pub fn portrait() -> Self {
        LayoutHints {
            column_widths: Vec::new(),
            orientation: Orientation::Portrait,
            summary_heading: Self::DEFAULT_SUMMARY_HEADING.to_string(),
        }
    }

    pub fn landscape() -> Self {
        LayoutHints {
            orientation: Orientation::Landscape,
            ..Self::portrait()
        }
    }

    pub fn with_widths(mut self, widths: &[&str]) -> Self {
        self.column_widths = widths.iter().map(|w| w.to_string()).collect();
        self
    }

    pub fn with_summary_heading(mut self, heading: &str) -> Self {
        self.summary_heading = heading.to_string();
        self
    }
}
