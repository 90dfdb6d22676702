use chrono::NaiveDate;
use cmmc_tracker::assessment::{AssessmentSnapshot, InMemoryAssessmentStore};
use cmmc_tracker::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Reads an exported assessment snapshot (JSON) from disk.
pub(crate) fn load_snapshot(path: &Path) -> Result<AssessmentSnapshot, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let snapshot: AssessmentSnapshot = serde_json::from_str(&raw)?;
    info!(
        path = %path.display(),
        controls = snapshot.controls.len(),
        poam_items = snapshot.poam_items.len(),
        "assessment snapshot loaded"
    );
    Ok(snapshot)
}

/// Seeds the in-memory store from `seed_path` when one is configured.
pub(crate) fn load_store(seed_path: Option<&Path>) -> Result<InMemoryAssessmentStore, AppError> {
    let snapshot = match seed_path {
        Some(path) => load_snapshot(path)?,
        None => AssessmentSnapshot::default(),
    };
    Ok(InMemoryAssessmentStore::from_snapshot(snapshot))
}
