// 📊 Billing Aggregation - group line items by guide number
// Descriptive fields take the first non-empty value in ingestion order,
// quantities and amounts are summed, dates collapse to a min/max range.

use crate::entities::{contains_ignore_case, BillingLine};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

const HD_PROGRAM: &str = "HEMODIÁLISE";
const HDF_PROGRAM: &str = "HEMODIAFILTRA";

// ============================================================================
// GUIDE AGGREGATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideAggregate {
    pub guide_number: String,
    pub name: String,
    pub registration: String,
    pub batch: String,
    pub treatment_program: String,
    pub plan: String,
    pub quantity: f64,
    pub total: f64,
    pub first_date: Option<NaiveDateTime>,
    pub last_date: Option<NaiveDateTime>,
    pub line_count: usize,
}

impl GuideAggregate {
    fn new(guide_number: &str) -> Self {
        GuideAggregate {
            guide_number: guide_number.to_string(),
            name: String::new(),
            registration: String::new(),
            batch: String::new(),
            treatment_program: String::new(),
            plan: String::new(),
            quantity: 0.0,
            total: 0.0,
            first_date: None,
            last_date: None,
            line_count: 0,
        }
    }

    fn absorb(&mut self, line: &BillingLine) {
        fill_first(&mut self.name, &line.name);
        fill_first(&mut self.registration, &line.registration);
        fill_first(&mut self.batch, &line.batch);
        fill_first(&mut self.treatment_program, &line.treatment_program);
        fill_first(&mut self.plan, &line.plan);

        self.quantity += line.quantity;
        self.total += line.total;
        self.line_count += 1;

        if let Some(date) = line.date {
            self.first_date = Some(self.first_date.map_or(date, |d| d.min(date)));
            self.last_date = Some(self.last_date.map_or(date, |d| d.max(date)));
        }
    }
}

fn fill_first(slot: &mut String, value: &str) {
    if slot.is_empty() && !value.is_empty() {
        *slot = value.to_string();
    }
}

/// One aggregate per non-empty guide number, sorted by patient name.
/// Guides sharing a name stay in guide-number order.
pub fn aggregate_by_guide(lines: &[BillingLine]) -> Vec<GuideAggregate> {
    let mut groups: BTreeMap<&str, GuideAggregate> = BTreeMap::new();

    for line in lines.iter().filter(|l| !l.guide_number.is_empty()) {
        groups
            .entry(line.guide_number.as_str())
            .or_insert_with(|| GuideAggregate::new(&line.guide_number))
            .absorb(line);
    }

    let mut aggregates: Vec<GuideAggregate> = groups.into_values().collect();
    aggregates.sort_by(|a, b| a.name.cmp(&b.name));
    aggregates
}

// ============================================================================
// BILLING SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillingSummary {
    pub guide_count: usize,
    pub total_sessions: f64,
    pub hd_sessions: f64,
    pub hdf_sessions: f64,
    pub total_amount: f64,
}

/// Totals over the raw line items (not the per-guide aggregates)
pub fn summarize_billing(lines: &[BillingLine]) -> BillingSummary {
    let guides: HashSet<&str> = lines
        .iter()
        .map(|l| l.guide_number.as_str())
        .filter(|g| !g.is_empty())
        .collect();

    let sum_where = |pred: &dyn Fn(&BillingLine) -> bool| -> f64 {
        lines.iter().filter(|l| pred(l)).map(|l| l.quantity).sum()
    };

    BillingSummary {
        guide_count: guides.len(),
        total_sessions: lines.iter().map(|l| l.quantity).sum(),
        hd_sessions: sum_where(&|l| contains_ignore_case(&l.treatment_program, HD_PROGRAM)),
        hdf_sessions: sum_where(&|l| contains_ignore_case(&l.treatment_program, HDF_PROGRAM)),
        total_amount: lines.iter().map(|l| l.total).sum(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
