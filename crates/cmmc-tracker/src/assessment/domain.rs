use serde::{Deserialize, Serialize};

/// Isolation key applied when a caller does not name a session.
pub const DEFAULT_SESSION: &str = "__default__";

/// Chart color for any enum value outside the canonical palettes.
pub const FALLBACK_COLOR: &str = "#6b7280";

fn default_session() -> String {
    DEFAULT_SESSION.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationStatus {
    Implemented,
    PartiallyImplemented,
    Planned,
    NotImplemented,
    NotApplicable,
    NotAssessed,
}

impl ImplementationStatus {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Implemented,
            Self::PartiallyImplemented,
            Self::Planned,
            Self::NotImplemented,
            Self::NotApplicable,
            Self::NotAssessed,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Implemented => "implemented",
            Self::PartiallyImplemented => "partially_implemented",
            Self::Planned => "planned",
            Self::NotImplemented => "not_implemented",
            Self::NotApplicable => "not_applicable",
            Self::NotAssessed => "not_assessed",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Implemented => "Implemented",
            Self::PartiallyImplemented => "Partially Implemented",
            Self::Planned => "Planned",
            Self::NotImplemented => "Not Implemented",
            Self::NotApplicable => "Not Applicable",
            Self::NotAssessed => "Not Assessed",
        }
    }

    pub const fn color(self) -> &'static str {
        match self {
            Self::Implemented => "#22c55e",
            Self::PartiallyImplemented => "#f59e0b",
            Self::Planned => "#3b82f6",
            Self::NotImplemented => "#ef4444",
            Self::NotApplicable => "#6b7280",
            Self::NotAssessed => "#94a3b8",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|status| status.as_str() == value)
    }
}

/// A control's status after defaults are applied. Values outside the canonical
/// set are carried through verbatim instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusValue<'a> {
    Known(ImplementationStatus),
    Unrecognized(&'a str),
}

impl<'a> StatusValue<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Self::Known(status) => status.as_str(),
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn known(&self) -> Option<ImplementationStatus> {
        match *self {
            Self::Known(status) => Some(status),
            Self::Unrecognized(_) => None,
        }
    }

    pub fn color(&self) -> &'static str {
        self.known().map_or(FALLBACK_COLOR, ImplementationStatus::color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Critical,
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    pub const fn ordered() -> [Self; 4] {
        [Self::Critical, Self::High, Self::Moderate, Self::Low]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
        }
    }

    pub const fn color(self) -> &'static str {
        match self {
            Self::Critical => "#dc2626",
            Self::High => "#ef4444",
            Self::Moderate => "#f59e0b",
            Self::Low => "#22c55e",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ordered().into_iter().find(|risk| risk.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoamStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl PoamStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Remediation still owed; only these items can be overdue.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }

    pub fn parse(value: &str) -> Option<Self> {
        [Self::Open, Self::InProgress, Self::Completed, Self::Cancelled]
            .into_iter()
            .find(|status| status.as_str() == value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Framework {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_controls: Option<i64>,
    #[serde(default)]
    pub total_objectives: Option<i64>,
    #[serde(default = "default_session")]
    pub session_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlFamily {
    pub id: String,
    #[serde(default)]
    pub framework_id: String,
    pub family_code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub control_count: Option<i64>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default = "default_session")]
    pub session_id: String,
}

impl ControlFamily {
    pub fn sort_key(&self) -> i64 {
        self.sort_order.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: String,
    pub family_id: String,
    pub control_number: String,
    pub title: String,
    #[serde(default)]
    pub requirement_text: Option<String>,
    #[serde(default)]
    pub plain_english: Option<String>,
    #[serde(default)]
    pub guidance_text: Option<String>,
    #[serde(default)]
    pub control_type: Option<String>,
    #[serde(default)]
    pub implementation_status: Option<String>,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default)]
    pub sprs_points_if_not_met: Option<i64>,
    #[serde(default)]
    pub implementation_notes: Option<String>,
    #[serde(default)]
    pub assessor_notes: Option<String>,
    #[serde(default)]
    pub last_assessed_date: Option<String>,
    #[serde(default)]
    pub assessed_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default = "default_session")]
    pub session_id: String,
}

impl Control {
    /// Missing or empty status reads as `not_assessed`.
    pub fn status(&self) -> StatusValue<'_> {
        match self.implementation_status.as_deref() {
            None | Some("") => StatusValue::Known(ImplementationStatus::NotAssessed),
            Some(raw) => ImplementationStatus::parse(raw)
                .map(StatusValue::Known)
                .unwrap_or(StatusValue::Unrecognized(raw)),
        }
    }

    /// Missing weight reads as 1. A stored zero is treated the same as missing.
    pub fn weight(&self) -> i64 {
        match self.weight {
            None | Some(0) => 1,
            Some(weight) => weight,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentObjective {
    pub id: String,
    pub control_id: String,
    pub objective_number: String,
    pub objective_text: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_session")]
    pub session_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub control_id: String,
    pub evidence_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub uploaded_at: String,
    #[serde(default)]
    pub uploaded_by: String,
    #[serde(default = "default_session")]
    pub session_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoamItem {
    pub id: String,
    pub control_id: String,
    #[serde(default)]
    pub weakness_description: Option<String>,
    #[serde(default)]
    pub remediation_plan: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub responsible_person: Option<String>,
    #[serde(default)]
    pub responsible_team: Option<String>,
    #[serde(default)]
    pub planned_start_date: Option<String>,
    #[serde(default)]
    pub planned_completion_date: Option<String>,
    #[serde(default)]
    pub actual_completion_date: Option<String>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub cost_notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub milestones: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default = "default_session")]
    pub session_id: String,
}

impl PoamItem {
    /// `None` for values outside the canonical set, including a missing status.
    pub fn status(&self) -> Option<PoamStatus> {
        self.status.as_deref().and_then(PoamStatus::parse)
    }

    /// Missing or empty risk reads as `moderate`; unknown values yield `None`.
    pub fn risk(&self) -> Option<RiskLevel> {
        match self.risk_level.as_deref() {
            None | Some("") => Some(RiskLevel::Moderate),
            Some(raw) => RiskLevel::parse(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryAsset {
    pub id: String,
    #[serde(default)]
    pub boundary_name: Option<String>,
    #[serde(default)]
    pub asset_tracker_id: Option<String>,
    #[serde(default)]
    pub asset_name: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub data_classification: Option<String>,
    #[serde(default = "default_in_scope")]
    pub in_scope: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_session")]
    pub session_id: String,
}

fn default_in_scope() -> i64 {
    1
}

impl BoundaryAsset {
    /// Only the flag value 1 marks an asset as in scope.
    pub fn is_in_scope(&self) -> bool {
        self.in_scope == 1
    }
}

/// A full export of assessment records, used to seed the in-memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    #[serde(default)]
    pub frameworks: Vec<Framework>,
    #[serde(default)]
    pub families: Vec<ControlFamily>,
    #[serde(default)]
    pub controls: Vec<Control>,
    #[serde(default)]
    pub objectives: Vec<AssessmentObjective>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub poam_items: Vec<PoamItem>,
    #[serde(default)]
    pub boundary_assets: Vec<BoundaryAsset>,
}
