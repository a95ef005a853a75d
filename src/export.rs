// 📤 Export - format selection, branding and file sinks
//
// The report layer hands an `ExportRequest` (title, table, summary, logo,
// layout) to an `ExportSink`. `FileExportSink` writes either a `;`-delimited
// spreadsheet (table, blank line, summary block) or a JSON document.

use crate::error::ExportError;
use crate::presentation::{LayoutHints, PresentationTable, Summary};
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

// ============================================================================
// FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Spreadsheet,
    Document,
}

impl ExportFormat {
    /// Case-insensitive; legacy names ("excel", "pdf") are accepted
    pub fn parse(name: &str) -> Result<Self, ExportError> {
        match name.trim().to_lowercase().as_str() {
            "spreadsheet" | "excel" | "xlsx" | "csv" => Ok(ExportFormat::Spreadsheet),
            "document" | "pdf" | "json" => Ok(ExportFormat::Document),
            _ => Err(ExportError::Unsupported(name.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "csv",
            ExportFormat::Document => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportFormat::parse(s)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Spreadsheet => f.write_str("spreadsheet"),
            ExportFormat::Document => f.write_str("document"),
        }
    }
}

// ============================================================================
// BRANDING
// ============================================================================

/// Clinic → logo file lookup under one assets directory
#[derive(Debug, Clone, PartialEq)]
pub struct Branding {
    pub assets_dir: PathBuf,
    pub default_logo: String,
    pub clinic_logos: HashMap<String, String>,
}

impl Branding {
    pub fn standard_clinic_logos() -> HashMap<String, String> {
        [
            ("Renal Clínica", "logo_renal_clinica.png"),
            ("Instituto do Rim", "logo_instituto_rim.png"),
            ("Nefron Clínica", "logo_nefron_clinica.png"),
            ("CNN", "logo_cnn.png"),
            ("Pronto Rim", "logo_pronto_rim.png"),
            ("Clínica do Rim", "logo_clinica_do_rim.png"),
            ("Hospital do Rim", "logo_hospital_do_rim.png"),
        ]
        .into_iter()
        .map(|(clinic, logo)| (clinic.to_string(), logo.to_string()))
        .collect()
    }

    /// Clinic logo, or the default logo for unknown (or no) clinic
    pub fn logo_for(&self, clinic: Option<&str>) -> PathBuf {
        let file = clinic
            .and_then(|c| self.clinic_logos.get(c))
            .unwrap_or(&self.default_logo);
        self.assets_dir.join(file)
    }
}

impl Default for Branding {
    fn default() -> Self {
        Branding {
            assets_dir: PathBuf::from("assets"),
            default_logo: "logo.png".to_string(),
            clinic_logos: Self::standard_clinic_logos(),
        }
    }
}

// ============================================================================
// REQUEST + SINK
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ExportRequest<'a> {
    pub title: &'a str,
    pub sheet_name: &'a str,
    pub logo: PathBuf,
    pub layout: &'a LayoutHints,
    pub table: &'a PresentationTable,
    pub summary: &'a Summary,
    #[serde(skip)]
    pub format: ExportFormat,
}

pub trait ExportSink {
    fn write(&self, request: &ExportRequest<'_>, path: &Path) -> Result<(), ExportError>;
}

/// Writes the artifact straight to disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExportSink;

impl ExportSink for FileExportSink {
    fn write(&self, request: &ExportRequest<'_>, path: &Path) -> Result<(), ExportError> {
        let bytes = match request.format {
            ExportFormat::Spreadsheet => spreadsheet_bytes(request)?,
            ExportFormat::Document => serde_json::to_vec_pretty(request)?,
        };

        fs::write(path, bytes).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            title = request.title,
            format = %request.format,
            rows = request.table.len(),
            path = %path.display(),
            "report exported"
        );
        Ok(())
    }
}

fn spreadsheet_bytes(request: &ExportRequest<'_>) -> Result<Vec<u8>, ExportError> {
    let mut table = WriterBuilder::new().delimiter(b';').from_writer(Vec::new());
    table.write_record(&request.table.columns)?;
    for row in &request.table.rows {
        table.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    let mut bytes = into_bytes(table)?;

    if !request.summary.is_empty() {
        let mut summary = WriterBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_writer(Vec::new());
        summary.write_record([request.layout.summary_heading.as_str()])?;
        for (key, value) in request.summary.iter() {
            summary.write_record([key.to_string(), value.to_string()])?;
        }
        bytes.push(b'\n');
        bytes.extend(into_bytes(summary)?);
    }

    Ok(bytes)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::Cell;

    fn request<'a>(
        table: &'a PresentationTable,
        summary: &'a Summary,
        layout: &'a LayoutHints,
        format: ExportFormat,
    ) -> ExportRequest<'a> {
        ExportRequest {
            title: "Geral - CNN - 03.2024",
            sheet_name: "Geral",
            logo: PathBuf::from("assets/logo_cnn.png"),
            layout,
            table,
            summary,
            format,
        }
    }

    fn sample() -> (PresentationTable, Summary) {
        let mut table = PresentationTable::new(&["Nome", "HD"]);
        table.push_row(vec![Cell::text("Maria Silva"), Cell::Int(12)]);
        table.push_row(vec![Cell::text("Ana Lima"), Cell::empty()]);
        let summary = Summary::new().int("Sessões HD", 12);
        (table, summary)
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse("Excel").unwrap(), ExportFormat::Spreadsheet);
        assert_eq!(ExportFormat::parse("pdf").unwrap(), ExportFormat::Document);
        assert_eq!("document".parse::<ExportFormat>().unwrap(), ExportFormat::Document);

        let err = ExportFormat::parse("docx").unwrap_err();
        assert_eq!(err.to_string(), "export format 'docx' is not supported");
    }

    #[test]
    fn test_logo_lookup() {
        let branding = Branding::default();
        assert_eq!(
            branding.logo_for(Some("Pronto Rim")),
            PathBuf::from("assets/logo_pronto_rim.png")
        );
        assert_eq!(branding.logo_for(Some("Outra")), PathBuf::from("assets/logo.png"));
        assert_eq!(branding.logo_for(None), PathBuf::from("assets/logo.png"));
    }

    #[test]
    fn test_spreadsheet_layout() {
        let (table, summary) = sample();
        let layout = LayoutHints::portrait();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geral.csv");

        FileExportSink
            .write(&request(&table, &summary, &layout, ExportFormat::Spreadsheet), &path)
            .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "Nome;HD\nMaria Silva;12\nAna Lima;\n\nRESUMO GERAL\nSessões HD;12\n"
        );
    }

    #[test]
    fn test_document_contains_everything() {
        let (table, summary) = sample();
        let layout = LayoutHints::landscape().with_widths(&["70%", "30%"]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geral.json");

        FileExportSink
            .write(&request(&table, &summary, &layout, ExportFormat::Document), &path)
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["title"], "Geral - CNN - 03.2024");
        assert_eq!(json["logo"], "assets/logo_cnn.png");
        assert_eq!(json["layout"]["orientation"], "landscape");
        assert_eq!(json["table"]["rows"][0][1], 12);
        assert_eq!(json["summary"]["Sessões HD"], 12);
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let (table, summary) = sample();
        let layout = LayoutHints::portrait();
        let err = FileExportSink
            .write(
                &request(&table, &summary, &layout, ExportFormat::Document),
                Path::new("/nonexistent/dir/out.json"),
            )
            .unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
