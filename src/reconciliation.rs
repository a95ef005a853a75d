// 🔗 Cross-Dataset Joiner - census assembly
// Reads the four census datasets fresh on every call and joins them onto the
// hemodialysis APAC base:
//
//   laudos_apac (base, one output row per APAC row)
//     ⟕ billing session tallies   on (name, APAC number = guide number)
//     ⟕ latest census entry       on name
//     ⟕ CDL placements            on name
//
// Presence in the base is authoritative: rows never disappear because an
// enrichment is missing, they get zero/empty fill instead.

use crate::db::TableStore;
use crate::deduplication::{keep_first_by, keep_last_by};
use crate::entities::{BillingLine, CatheterEvent, CensusEntry, LaudoApac, SerologyMarkers, SessionKind};
use crate::error::StoreError;
use crate::format::format_date_br;
use crate::rules::{ProcedureCategory, RuleEngine};
use crate::schema::Dataset;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

// ============================================================================
// BILLING SIDE
// ============================================================================

/// Public-insurer lines with repeated (name, guide, service) items removed.
/// First occurrence wins, so ingestion order matters.
pub fn public_billing_lines(lines: Vec<BillingLine>) -> Vec<BillingLine> {
    let public = lines.into_iter().filter(BillingLine::is_public_insurer);
    keep_first_by(public, BillingLine::dedup_key)
}

/// Regular and extra dialysis quantities billed under one guide
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SessionTally {
    pub regular: f64,
    pub extra: f64,
}

pub type GuideKey = (String, String);

/// Sum dialysis quantities per (name, guide number). Lines without a guide
/// number are skipped: they can never match an APAC.
pub fn session_tallies(lines: &[BillingLine]) -> HashMap<GuideKey, SessionTally> {
    let mut tallies: HashMap<GuideKey, SessionTally> = HashMap::new();

    for line in lines.iter().filter(|l| l.is_hemodialysis_group()) {
        let Some(kind) = line.session_kind() else {
            continue;
        };
        if line.guide_number.is_empty() {
            continue;
        }

        let tally = tallies
            .entry((line.name.clone(), line.guide_number.clone()))
            .or_default();
        match kind {
            SessionKind::Regular => tally.regular += line.quantity,
            SessionKind::Extra => tally.extra += line.quantity,
        }
    }

    tallies
}

// ============================================================================
// CENSUS + CATHETER SIDE
// ============================================================================

/// Most recent census entry per patient (by admission date). Entries without
/// a date lose to any dated entry; ties go to the later row.
pub fn latest_census_entries(entries: Vec<CensusEntry>) -> HashMap<String, CensusEntry> {
    let mut entries = entries;
    // Stable sort: None < Some, equal dates keep ingestion order
    entries.sort_by_key(|e| e.entry_date);

    keep_last_by(entries, |e| e.name.clone())
        .into_iter()
        .map(|e| (e.name.clone(), e))
        .collect()
}

/// Patients with at least one billable double-lumen catheter placement
pub fn cdl_placements(events: &[CatheterEvent]) -> HashSet<String> {
    events
        .iter()
        .filter(|e| e.is_cdl_placement())
        .map(|e| e.name.clone())
        .collect()
}

/// Last APAC number seen per patient (any procedure)
pub fn latest_apac_numbers(apacs: &[LaudoApac]) -> HashMap<String, String> {
    apacs
        .iter()
        .map(|a| (a.name.clone(), a.apac_number.clone()))
        .collect()
}

// ============================================================================
// CENSUS ROW
// ============================================================================

/// One hemodialysis APAC enriched with sessions, CDL, serology and dates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CensusRow {
    pub name: String,
    pub apac_number: String,
    pub regular_sessions: i64,
    pub extra_sessions: i64,
    pub cdl: bool,
    pub serology: SerologyMarkers,
    pub entry_date: Option<NaiveDateTime>,
    pub exit_date: Option<NaiveDateTime>,
    /// "Transf. 10/03/2024"; empty when the patient has no exit date
    pub exit_label: String,
}

impl CensusRow {
    pub fn has_exit(&self) -> bool {
        !self.exit_label.is_empty()
    }

    pub fn total_sessions(&self) -> i64 {
        self.regular_sessions + self.extra_sessions
    }

    pub fn cdl_label(&self) -> &'static str {
        if self.cdl {
            "CDL"
        } else {
            ""
        }
    }
}

fn exit_label(apac: &LaudoApac) -> String {
    match &apac.exit_date {
        Some(date) => format!("{} {}", apac.situation_abbreviation(), format_date_br(date))
            .trim()
            .to_string(),
        None => String::new(),
    }
}

/// Pure join over already-loaded datasets
pub fn census_rows(
    apacs: Vec<LaudoApac>,
    billing: Vec<BillingLine>,
    census: Vec<CensusEntry>,
    events: &[CatheterEvent],
) -> Vec<CensusRow> {
    let tallies = session_tallies(&public_billing_lines(billing));
    let latest = latest_census_entries(census);
    let cdl = cdl_placements(events);

    apacs
        .into_iter()
        .filter(LaudoApac::is_hemodialysis)
        .map(|apac| {
            let tally = tallies
                .get(&(apac.name.clone(), apac.apac_number.clone()))
                .copied()
                .unwrap_or_default();
            let entry = latest.get(&apac.name);

            CensusRow {
                regular_sessions: tally.regular.trunc() as i64,
                extra_sessions: tally.extra.trunc() as i64,
                cdl: cdl.contains(&apac.name),
                serology: entry.map(CensusEntry::serology).unwrap_or_default(),
                entry_date: entry.and_then(|e| e.entry_date),
                exit_date: apac.exit_date,
                exit_label: exit_label(&apac),
                name: apac.name,
                apac_number: apac.apac_number,
            }
        })
        .collect()
}

/// Read the census datasets from `store` and join them
pub fn assemble_census(store: &TableStore) -> Result<Vec<CensusRow>, StoreError> {
    let apacs = load(store, Dataset::LaudosApac, LaudoApac::from_record)?;
    let billing = load(store, Dataset::FaturamentoGeral, BillingLine::from_record)?;
    let census = load(store, Dataset::EstatisticaMensal, CensusEntry::from_record)?;
    let events = load(store, Dataset::EventosCateter, CatheterEvent::from_record)?;

    let rows = census_rows(apacs, billing, census, &events);
    debug!(rows = rows.len(), "census assembled");
    Ok(rows)
}

// ============================================================================
// PROCEDURE ROWS
// ============================================================================

/// One classified clinical procedure with the patient's latest APAC number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureRow {
    pub name: String,
    /// Empty when the patient has no APAC at all
    pub apac_number: String,
    pub category: ProcedureCategory,
}

pub fn procedure_rows(
    events: &[CatheterEvent],
    apacs: &[LaudoApac],
    engine: &RuleEngine,
) -> Vec<ProcedureRow> {
    let apac_numbers = latest_apac_numbers(apacs);

    events
        .iter()
        .filter_map(|event| {
            let category = engine.classify(event);
            category.is_clinical().then(|| ProcedureRow {
                name: event.name.clone(),
                apac_number: apac_numbers.get(&event.name).cloned().unwrap_or_default(),
                category,
            })
        })
        .collect()
}

pub fn assemble_procedures(store: &TableStore, engine: &RuleEngine) -> Result<Vec<ProcedureRow>, StoreError> {
    let events = load(store, Dataset::EventosCateter, CatheterEvent::from_record)?;
    let apacs = load(store, Dataset::LaudosApac, LaudoApac::from_record)?;
    Ok(procedure_rows(&events, &apacs, engine))
}

/// Scan a dataset and map every record into its typed view
pub fn load<T>(
    store: &TableStore,
    dataset: Dataset,
    view: impl Fn(&crate::parser::Record) -> T,
) -> Result<Vec<T>, StoreError> {
    Ok(store.scan(dataset)?.iter().map(view).collect())
}

// ============================================================================
// TESTS
// ============================================================================
