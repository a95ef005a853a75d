// 🏗️ Ingestion Normalizer
// Turns one `;`-delimited Latin-1 extract into canonical typed records.
//
// Pipeline per file:
//   decode → skip banner line → positional columns → trim → coerce → drop
//   rows without a name → stamp every row with one import timestamp

use crate::error::IngestError;
use crate::schema::{ColumnKind, Dataset, DatasetSchema, NAME_COLUMN};
use chrono::{Local, NaiveDateTime, Timelike};
use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use serde::Serialize;
use tracing::debug;

/// Pattern used by the source system for every date column
pub const INPUT_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Pattern used for dates and batch timestamps inside the store
pub const STORAGE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const FIELD_DELIMITER: u8 = b';';

// ============================================================================
// CELL VALUES
// ============================================================================

/// One coerced cell. The parse-or-default contract lives in the constructors
/// below: dates degrade to `Date(None)`, numbers degrade to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Date(Option<NaiveDateTime>),
    Number(f64),
    Integer(i64),
}

impl Value {
    /// Coerce a trimmed raw cell according to its column kind
    pub fn coerce(raw: &str, kind: ColumnKind) -> Value {
        match kind {
            ColumnKind::Text => Value::Text(raw.to_string()),
            ColumnKind::Date => Value::Date(parse_date(raw)),
            ColumnKind::Number => Value::Number(parse_number(raw)),
            ColumnKind::Integer => Value::Integer(parse_number(raw).trunc() as i64),
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Value::Text(s) => s,
            _ => "",
        }
    }
}

/// `dd/mm/yyyy HH:MM:SS` → timestamp; anything else → `None`
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), INPUT_DATE_FORMAT).ok()
}

/// Comma-decimal number → f64; anything unparsable (or non-finite) → 0.0
pub fn parse_number(raw: &str) -> f64 {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

// ============================================================================
// CANONICAL RECORD
// ============================================================================

/// One normalized row, values aligned with the dataset's canonical columns
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub dataset: Dataset,
    pub values: Vec<Value>,
    pub imported_at: NaiveDateTime,
}

impl Record {
    pub fn schema(&self) -> &'static DatasetSchema {
        self.dataset.schema()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema()
            .canonical_index(column)
            .and_then(|i| self.values.get(i))
    }

    /// Text value of `column`, empty when missing or not a text column
    pub fn text(&self, column: &str) -> &str {
        self.get(column).map(Value::as_text).unwrap_or("")
    }

    pub fn date(&self, column: &str) -> Option<NaiveDateTime> {
        match self.get(column) {
            Some(Value::Date(d)) => *d,
            _ => None,
        }
    }

    pub fn number(&self, column: &str) -> f64 {
        match self.get(column) {
            Some(Value::Number(n)) => *n,
            Some(Value::Integer(i)) => *i as f64,
            _ => 0.0,
        }
    }

    pub fn integer(&self, column: &str) -> i64 {
        match self.get(column) {
            Some(Value::Integer(i)) => *i,
            Some(Value::Number(n)) => n.trunc() as i64,
            _ => 0,
        }
    }

    pub fn name(&self) -> &str {
        self.text(NAME_COLUMN)
    }
}

// ============================================================================
// NORMALIZED TABLE
// ============================================================================

#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub dataset: Dataset,
    pub imported_at: NaiveDateTime,
    pub records: Vec<Record>,
    /// Data rows read from the file (banner excluded)
    pub rows_read: usize,
    /// Rows discarded because the name was empty
    pub rows_dropped: usize,
}

impl NormalizedTable {
    /// A file whose every row lacked a name: a no-op import, not an error
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Normalize `bytes` for `dataset`, stamped with the current local time
pub fn normalize(bytes: &[u8], dataset: Dataset) -> Result<NormalizedTable, IngestError> {
    let now = Local::now().naive_local();
    // Batch timestamps are stored at second precision
    let imported_at = now.with_nanosecond(0).unwrap_or(now);
    normalize_at(bytes, dataset, imported_at)
}

/// Normalize `bytes` for `dataset` with an explicit batch timestamp
pub fn normalize_at(
    bytes: &[u8],
    dataset: Dataset,
    imported_at: NaiveDateTime,
) -> Result<NormalizedTable, IngestError> {
    let schema = dataset.schema();
    let text = decode_latin1(bytes);
    let body = skip_banner(&text);

    let mut reader = ReaderBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let expected = schema.raw_column_count();
    let name_index = schema.raw_index(NAME_COLUMN).unwrap_or(0);
    let projection: Vec<(usize, ColumnKind)> = schema
        .canonical_columns
        .iter()
        .map(|column| {
            let raw = schema.raw_index(column).unwrap_or(usize::MAX);
            (raw, schema.column_kind(column))
        })
        .collect();

    let mut records = Vec::new();
    let mut rows_read = 0;
    let mut rows_dropped = 0;
    let mut column_count: Option<usize> = None;

    for result in reader.records() {
        let row = result.map_err(|source| IngestError::Csv { dataset, source })?;

        // Shape comes from the first data row; later rows may be shorter
        // (missing trailing cells) but never wider.
        let width = row.len();
        match column_count {
            None if width != expected => {
                return Err(IngestError::ColumnCountMismatch { dataset, expected, actual: width });
            }
            None => column_count = Some(width),
            Some(_) if width > expected => {
                return Err(IngestError::ColumnCountMismatch { dataset, expected, actual: width });
            }
            Some(_) => {}
        }
        rows_read += 1;

        let cell = |i: usize| row.get(i).map(str::trim).unwrap_or("");

        if cell(name_index).is_empty() {
            rows_dropped += 1;
            debug!(dataset = %dataset, row = rows_read, "dropping row without name");
            continue;
        }

        let values = projection
            .iter()
            .map(|(raw, kind)| Value::coerce(cell(*raw), *kind))
            .collect();

        records.push(Record { dataset, values, imported_at });
    }

    debug!(
        dataset = %dataset,
        rows_read,
        rows_dropped,
        kept = records.len(),
        "normalized import file"
    );

    Ok(NormalizedTable {
        dataset,
        imported_at,
        records,
        rows_read,
        rows_dropped,
    })
}

/// Latin-1 extracts are decoded as Windows-1252 (its superset for printable text)
pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Drop the first line (a title banner, never a header)
fn skip_banner(text: &str) -> &str {
    match text.find('\n') {
        Some(pos) => &text[pos + 1..],
        None => "",
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn batch_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn sessions_file(rows: &[&str]) -> Vec<u8> {
        let mut text = String::from("Relatorio de sessoes HD - Marco/2024\n");
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text.into_bytes()
    }

    #[test]
    fn test_parse_number_comma_decimal() {
        assert_eq!(parse_number("1,5"), 1.5);
        assert_eq!(parse_number(" 12 "), 12.0);
        assert_eq!(parse_number("abc"), 0.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("1.234,56"), 0.0);
        assert_eq!(parse_number("NaN"), 0.0);
    }

    #[test]
    fn test_parse_date_fixed_pattern() {
        let parsed = parse_date("05/03/2024 14:30:00").unwrap();
        assert_eq!(parsed.to_string(), "2024-03-05 14:30:00");

        assert_eq!(parse_date("2024-03-05"), None);
        assert_eq!(parse_date("05/03/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_integer_columns_truncate() {
        assert_eq!(Value::coerce("12,9", ColumnKind::Integer), Value::Integer(12));
        assert_eq!(Value::coerce("x", ColumnKind::Integer), Value::Integer(0));
    }

    #[test]
    fn test_normalize_sessions() {
        let bytes = sessions_file(&[
            "  Maria Silva ;SUS;12;1,0;2;0;;15",
            "Jose Souza;SUS;x;0;0;1;;13",
        ]);

        let table = normalize_at(&bytes, Dataset::SessoesHd, batch_time()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows_read, 2);
        assert_eq!(table.rows_dropped, 0);

        let maria = &table.records[0];
        assert_eq!(maria.name(), "Maria Silva");
        assert_eq!(maria.integer("hd_normais"), 12);
        assert_eq!(maria.integer("hd_extras"), 1);
        assert_eq!(maria.integer("hd_remarcadas"), 2);
        assert_eq!(maria.imported_at, batch_time());

        // Unparsable count degrades to zero, row is kept
        assert_eq!(table.records[1].integer("hd_normais"), 0);
    }

    #[test]
    fn test_rows_without_name_are_dropped() {
        let bytes = sessions_file(&[
            ";SUS;12;0;0;0;;12",
            "   ;SUS;3;0;0;0;;3",
            "Ana Lima;SUS;10;0;0;0;;10",
        ]);

        let table = normalize_at(&bytes, Dataset::SessoesHd, batch_time()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows_dropped, 2);
        assert!(table.records.iter().all(|r| !r.name().is_empty()));
    }

    #[test]
    fn test_all_rows_unnamed_is_empty_not_error() {
        let bytes = sessions_file(&[";SUS;12;0;0;0;;12"]);
        let table = normalize_at(&bytes, Dataset::SessoesHd, batch_time()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_column_count_mismatch() {
        let bytes = sessions_file(&["Maria Silva;SUS;12;0;0"]);
        let err = normalize_at(&bytes, Dataset::SessoesHd, batch_time()).unwrap_err();

        match err {
            IngestError::ColumnCountMismatch { dataset, expected, actual } => {
                assert_eq!(dataset, Dataset::SessoesHd);
                assert_eq!(expected, 8);
                assert_eq!(actual, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wider_later_row_rejects_file() {
        let bytes = sessions_file(&[
            "Maria Silva;SUS;12;0;0;0;;12",
            "Jose Souza;SUS;12;0;0;0;;12;extra",
        ]);
        let err = normalize_at(&bytes, Dataset::SessoesHd, batch_time()).unwrap_err();
        assert!(matches!(err, IngestError::ColumnCountMismatch { actual: 9, .. }));
    }

    #[test]
    fn test_dates_and_latin1() {
        // "Colocação" and "Duplo Lúmen" encoded as Latin-1 bytes
        let mut bytes = b"Eventos\n".to_vec();
        bytes.extend_from_slice(b"05/03/2024 08:00:00;Cateter;Maria Silva;Coloca\xe7\xe3o;Duplo L\xfamen HD;Jugular;SUS;;;;;;;\n");
        bytes.extend_from_slice(b"31/02/2024 08:00:00;Cateter;Jose Souza;Retirada;Longa Perm. HD;Jugular;SUS;;;;;;;\n");

        let table = normalize_at(&bytes, Dataset::EventosCateter, batch_time()).unwrap();
        assert_eq!(table.len(), 2);

        let first = &table.records[0];
        assert_eq!(first.text("evento"), "Colocação");
        assert_eq!(first.text("tipo"), "Duplo Lúmen HD");
        assert_eq!(first.date("data").unwrap().to_string(), "2024-03-05 08:00:00");

        // Invalid calendar date becomes null, row survives
        assert_eq!(table.records[1].date("data"), None);
        assert_eq!(table.records[1].text("evento"), "Retirada");
    }

    #[test]
    fn test_banner_only_file_is_empty() {
        let table = normalize_at(b"Banner only", Dataset::SessoesHd, batch_time()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.rows_read, 0);
    }

    #[test]
    fn test_canonical_projection_reorders_and_subsets() {
        let mut row = vec![""; 21];
        row[1] = "Maria Silva";
        row[6] = "10/01/2024 00:00:00";
        row[12] = "Não Reagente";
        row[13] = "Reagente";
        let text = format!("banner\n{}\n", row.join(";"));

        let table = normalize_at(text.as_bytes(), Dataset::EstatisticaMensal, batch_time()).unwrap();
        let record = &table.records[0];

        assert_eq!(record.values.len(), 7);
        assert_eq!(record.name(), "Maria Silva");
        assert_eq!(record.text("hbsag"), "Reagente");
        assert!(record.date("dt_entr").is_some());
        assert_eq!(record.get("cpf"), None);
    }
}
