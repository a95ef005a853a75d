// Dialysis Reports - CLI
// import extracts, check dataset status, export reports, review corrections

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use dialysis_reports::reports::{rescheduled_table, rescheduled_total};
use dialysis_reports::{
    build_report, AppConfig, Dataset, ExportFormat, FileExportSink, ImportJob, ImportOutcome,
    ReportParams, TableStore, REPORT_GROUPS,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dialysis-reports",
    version,
    about = "Monthly closing reports for dialysis clinics"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(long, global = true, env = "DIALISE_DB", value_name = "PATH")]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Import one extract, replacing the dataset's previous contents
    Import {
        /// Dataset name (laudos_apac, sessoes_hd, ...)
        dataset: String,
        /// `;`-delimited Latin-1 file
        file: PathBuf,
    },

    /// Show the last import of every dataset and the report groups
    Status,

    /// Export one report
    Report {
        /// Report name (Geral, Entrada, Saída, Fístulas, Continuidade, Geral Convênio)
        name: String,
        #[arg(long)]
        clinic: Option<String>,
        /// Reference month (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,
        /// Reference year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
        /// spreadsheet | document
        #[arg(long, default_value = "spreadsheet")]
        format: String,
        /// Output file (defaults to "<report title>.<ext>")
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Rescheduled sessions to review before closing
    Corrections,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let db_path = cli.database.clone().unwrap_or_else(|| config.database_path.clone());

    let mut store = TableStore::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let result = match cli.command {
        Command::Import { dataset, file } => run_import(&mut store, &dataset, file),
        Command::Status => run_status(&store),
        Command::Report {
            name,
            clinic,
            month,
            year,
            format,
            output,
        } => run_report(&store, &config, &name, clinic.as_deref(), month, year, &format, output),
        Command::Corrections => run_corrections(&store),
    };

    store.close().context("Failed to close database")?;
    result
}

fn run_import(store: &mut TableStore, dataset: &str, file: PathBuf) -> Result<()> {
    println!("📥 Importing {} → {}", file.display(), dataset);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let job = ImportJob::for_dataset_name(dataset, file)?;
    let outcome = job.run(store, |progress| println!("  {:>3}%", progress.percent()))?;

    match &outcome {
        ImportOutcome::Imported { rows, imported_at, .. } => {
            println!("✓ {} ({} linhas, lote {})", outcome.message(), rows, imported_at);
        }
        ImportOutcome::NoValidRows { .. } => {
            println!("⚠️  {}", outcome.message());
        }
    }
    Ok(())
}

fn run_status(store: &TableStore) -> Result<()> {
    println!("🗄️  Datasets");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for dataset in Dataset::ALL {
        match store.last_import_info(dataset) {
            Some(info) => println!(
                "✓ {:<22} {:>6} linhas  importado em {}",
                dataset.table_name(),
                info.row_count,
                info.imported_at
            ),
            None => println!("✗ {:<22} nunca importado", dataset.table_name()),
        }
    }

    for group in REPORT_GROUPS {
        println!("\n📋 {}", group.name);
        let exports: Vec<&str> = group.exports.iter().map(|k| k.name()).collect();
        println!("   Relatórios: {}", exports.join(", "));
        if !group.corrections.is_empty() {
            println!("   Correções:  {}", group.corrections.join(", "));
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_report(
    store: &TableStore,
    config: &AppConfig,
    name: &str,
    clinic: Option<&str>,
    month: Option<u32>,
    year: Option<i32>,
    format: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let params = ReportParams::new(
        clinic,
        month.unwrap_or_else(|| today.month()),
        year.unwrap_or_else(|| today.year()),
    )?;
    let extension = ExportFormat::parse(format)?.extension();
    let report = build_report(name, params)?;

    let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.{extension}", report.title())));
    let rendered = report.export(store, &FileExportSink, format, &path, &config.branding())?;

    info!(report = %rendered.kind, path = %path.display(), "export finished");
    println!("✓ {} → {}", rendered.title, path.display());
    for (key, value) in rendered.summary.iter() {
        println!("   {key}: {value}");
    }
    Ok(())
}

fn run_corrections(store: &TableStore) -> Result<()> {
    println!("✏️  Remarcações: {}", rescheduled_total(store));

    let table = rescheduled_table(store);
    if table.is_empty() {
        println!("   Nenhum paciente com sessões remarcadas.");
        return Ok(());
    }

    println!("   {}", table.columns.join(" | "));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        println!("   {}", cells.join(" | "));
    }
    Ok(())
}
