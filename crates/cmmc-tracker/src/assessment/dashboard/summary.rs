use super::super::domain::{Control, ControlFamily, ImplementationStatus, PoamItem, StatusValue};
use super::super::scoring::SprsCalculator;
use super::views::{ChartEntry, FamilyHeatmapEntry, PoamSummary, TrendPoint};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Reference history shown ahead of the live score on the trend chart.
const SCORE_TREND_HISTORY: [(&str, i64); 5] = [
    ("Sep 2025", -85),
    ("Oct 2025", -62),
    ("Nov 2025", -48),
    ("Dec 2025", -35),
    ("Jan 2026", -28),
];
const CURRENT_PERIOD_LABEL: &str = "Feb 2026";

/// Everything the assessment dashboard renders, derived from one session's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub sprs_score: i64,
    pub total_controls: usize,
    pub assessed_controls: usize,
    pub implementation_breakdown: Vec<ChartEntry>,
    pub family_heatmap: Vec<FamilyHeatmapEntry>,
    pub poam_summary: PoamSummary,
    pub boundary_count: usize,
    pub score_trend: Vec<TrendPoint>,
}

impl DashboardSummary {
    /// Aggregates a consistent snapshot of one session. `reference_date` is the
    /// cutoff for overdue POA&M items; the caller decides what "today" is.
    pub fn build(
        controls: &[Control],
        families: &[ControlFamily],
        poam_items: &[PoamItem],
        in_scope_boundary_count: usize,
        reference_date: NaiveDate,
    ) -> Self {
        let sprs_score = SprsCalculator::calculate(controls);

        let assessed_controls = controls
            .iter()
            .filter(|control| {
                control.status() != StatusValue::Known(ImplementationStatus::NotAssessed)
            })
            .count();

        Self {
            sprs_score,
            total_controls: controls.len(),
            assessed_controls,
            implementation_breakdown: implementation_breakdown(controls),
            family_heatmap: super::family_heatmap(controls, families),
            poam_summary: super::poam_summary(poam_items, reference_date),
            boundary_count: in_scope_boundary_count,
            score_trend: score_trend(sprs_score),
        }
    }
}

fn implementation_breakdown(controls: &[Control]) -> Vec<ChartEntry> {
    let mut counts: HashMap<ImplementationStatus, usize> = HashMap::new();
    for status in controls.iter().filter_map(|control| control.status().known()) {
        *counts.entry(status).or_default() += 1;
    }

    ImplementationStatus::ordered()
        .into_iter()
        .filter_map(|status| {
            counts
                .get(&status)
                .filter(|count| **count > 0)
                .map(|count| ChartEntry {
                    label: status.label(),
                    value: *count,
                    color: status.color(),
                })
        })
        .collect()
}

fn score_trend(current: i64) -> Vec<TrendPoint> {
    SCORE_TREND_HISTORY
        .iter()
        .map(|&(name, value)| TrendPoint { name, value })
        .chain(std::iter::once(TrendPoint {
            name: CURRENT_PERIOD_LABEL,
            value: current,
        }))
        .collect()
}
