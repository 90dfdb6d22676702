use serde::Serialize;

/// One slice of a pie/bar chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartEntry {
    pub label: &'static str,
    pub value: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyHeatmapEntry {
    pub name: String,
    pub code: String,
    pub total: usize,
    pub implemented: usize,
    pub percentage: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoamSummary {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub overdue: usize,
    pub by_risk: Vec<ChartEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub name: &'static str,
    pub value: i64,
}
