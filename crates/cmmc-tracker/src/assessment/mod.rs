//! Compliance assessment records, SPRS scoring, and dashboard rollups.

pub mod dashboard;
pub mod domain;
pub mod router;
pub mod scoring;
pub mod service;
pub mod store;

pub use dashboard::views::{ChartEntry, FamilyHeatmapEntry, PoamSummary, TrendPoint};
pub use dashboard::DashboardSummary;
pub use domain::{
    AssessmentObjective, AssessmentSnapshot, BoundaryAsset, Control, ControlFamily, Evidence,
    Framework, ImplementationStatus, PoamItem, PoamStatus, RiskLevel, StatusValue,
    DEFAULT_SESSION, FALLBACK_COLOR,
};
pub use router::{assessment_router, AssessmentApi};
pub use scoring::{ControlDeduction, ScoreBreakdown, SprsCalculator};
pub use service::{AssessmentService, AssessmentServiceError};
pub use store::{AssessmentStore, InMemoryAssessmentStore, StoreError};

#[cfg(test)]
mod tests;
