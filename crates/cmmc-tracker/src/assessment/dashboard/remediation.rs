use super::super::domain::{PoamItem, PoamStatus, RiskLevel};
use super::views::{ChartEntry, PoamSummary};
use chrono::NaiveDate;
use std::collections::HashMap;

pub(crate) fn poam_summary(items: &[PoamItem], reference_date: NaiveDate) -> PoamSummary {
    // Stored dates are ISO strings, which order lexicographically by date.
    let cutoff = reference_date.format("%Y-%m-%d").to_string();

    let mut open = 0;
    let mut in_progress = 0;
    let mut overdue = 0;
    let mut risk_counts: HashMap<RiskLevel, usize> = HashMap::new();

    for item in items {
        let status = item.status();
        match status {
            Some(PoamStatus::Open) => open += 1,
            Some(PoamStatus::InProgress) => in_progress += 1,
            _ => {}
        }

        let past_due = item
            .planned_completion_date
            .as_deref()
            .is_some_and(|planned| !planned.is_empty() && planned < cutoff.as_str());
        if past_due && status.is_some_and(PoamStatus::is_active) {
            overdue += 1;
        }

        if let Some(risk) = item.risk() {
            *risk_counts.entry(risk).or_default() += 1;
        }
    }

    let by_risk = RiskLevel::ordered()
        .into_iter()
        .filter_map(|risk| {
            risk_counts
                .get(&risk)
                .filter(|count| **count > 0)
                .map(|count| ChartEntry {
                    label: risk.label(),
                    value: *count,
                    color: risk.color(),
                })
        })
        .collect();

    PoamSummary {
        total: items.len(),
        open,
        in_progress,
        overdue,
        by_risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 12).expect("valid reference date")
    }

    fn item(status: &str, risk: Option<&str>, due: Option<&str>) -> PoamItem {
        PoamItem {
            status: Some(status.to_string()),
            risk_level: risk.map(str::to_string),
            planned_completion_date: due.map(str::to_string),
            ..PoamItem::default()
        }
    }

    #[test]
    fn overdue_uses_strict_date_comparison() {
        let items = [
            item("open", None, Some("2026-02-11")),
            item("open", None, Some("2026-02-12")),
            item("completed", None, Some("2025-12-01")),
            item("in_progress", None, Some("2026-01-30")),
            item("open", None, None),
            item("open", None, Some("")),
        ];
        let summary = poam_summary(&items, reference_date());
        assert_eq!(summary.total, 6);
        assert_eq!(summary.open, 4);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.overdue, 2);
    }

    #[test]
    fn cancelled_items_are_never_overdue() {
        let items = [item("cancelled", Some("high"), Some("2024-01-01"))];
        let summary = poam_summary(&items, reference_date());
        assert_eq!(summary.overdue, 0);
        assert_eq!(summary.open, 0);
    }

    #[test]
    fn risk_buckets_follow_severity_order() {
        let items = [
            item("open", Some("low"), None),
            item("open", None, None),
            item("open", Some("critical"), None),
            item("open", Some("low"), None),
            item("open", Some("catastrophic"), None),
        ];
        let summary = poam_summary(&items, reference_date());
        let labels: Vec<(&str, usize)> = summary
            .by_risk
            .iter()
            .map(|entry| (entry.label, entry.value))
            .collect();
        assert_eq!(labels, vec![("Critical", 1), ("Moderate", 1), ("Low", 2)]);
        assert_eq!(summary.by_risk[0].color, "#dc2626");
    }
}
