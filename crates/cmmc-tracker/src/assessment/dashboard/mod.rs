mod heatmap;
mod remediation;
mod summary;
pub mod views;

pub use summary::DashboardSummary;

pub(crate) use heatmap::family_heatmap;
pub(crate) use remediation::poam_summary;
