use std::sync::Arc;

use axum::body::to_bytes;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::assessment::domain::{
    AssessmentObjective, AssessmentSnapshot, BoundaryAsset, Control, ControlFamily, Evidence,
    Framework, PoamItem,
};
use crate::assessment::store::InMemoryAssessmentStore;
use crate::assessment::{AssessmentApi, AssessmentService};

pub(super) const SESSION: &str = "__default__";
pub(super) const OTHER_SESSION: &str = "demo-bravo";

pub(super) fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 12).expect("valid reference date")
}

fn family(id: &str, code: &str, name: &str, sort_order: Option<i64>) -> ControlFamily {
    ControlFamily {
        id: id.to_string(),
        framework_id: "fw-cmmc".to_string(),
        family_code: code.to_string(),
        name: name.to_string(),
        sort_order,
        session_id: SESSION.to_string(),
        ..ControlFamily::default()
    }
}

fn control(
    id: &str,
    family_id: &str,
    number: &str,
    title: &str,
    status: Option<&str>,
    weight: i64,
    sort_order: i64,
) -> Control {
    Control {
        id: id.to_string(),
        family_id: family_id.to_string(),
        control_number: number.to_string(),
        title: title.to_string(),
        implementation_status: status.map(str::to_string),
        weight: Some(weight),
        sort_order: Some(sort_order),
        session_id: SESSION.to_string(),
        ..Control::default()
    }
}

fn poam(
    id: &str,
    control_id: &str,
    status: &str,
    risk: Option<&str>,
    due: &str,
    created_at: &str,
) -> PoamItem {
    PoamItem {
        id: id.to_string(),
        control_id: control_id.to_string(),
        status: Some(status.to_string()),
        risk_level: risk.map(str::to_string),
        planned_completion_date: Some(due.to_string()),
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
        session_id: SESSION.to_string(),
        ..PoamItem::default()
    }
}

fn asset(id: &str, name: &str, in_scope: i64) -> BoundaryAsset {
    BoundaryAsset {
        id: id.to_string(),
        boundary_name: Some("CUI Enclave".to_string()),
        asset_tracker_id: Some(format!("TRK-{id}")),
        asset_name: Some(name.to_string()),
        asset_type: Some("workstation".to_string()),
        data_classification: Some("CUI".to_string()),
        in_scope,
        notes: None,
        session_id: SESSION.to_string(),
    }
}

fn evidence(id: &str, control_id: &str, title: &str, uploaded_at: &str) -> Evidence {
    Evidence {
        id: id.to_string(),
        control_id: control_id.to_string(),
        evidence_type: "policy".to_string(),
        title: title.to_string(),
        description: None,
        file_path: None,
        external_url: None,
        uploaded_at: uploaded_at.to_string(),
        uploaded_by: "admin".to_string(),
        session_id: SESSION.to_string(),
    }
}

/// Four controls across two families, scoring 104, plus one foreign-session control.
pub(super) fn snapshot() -> AssessmentSnapshot {
    let mut access = control(
        "ctl-311",
        "fam-ac",
        "3.1.1",
        "Limit system access",
        Some("implemented"),
        5,
        1,
    );
    access.requirement_text =
        Some("Limit information system access to authorized users.".to_string());
    let mut awareness = control(
        "ctl-321",
        "fam-at",
        "3.2.1",
        "Role-based risk awareness",
        Some("not_implemented"),
        3,
        3,
    );
    awareness.control_type = Some("basic".to_string());

    let mut foreign = control(
        "ctl-x11",
        "fam-ac",
        "3.1.1",
        "Limit system access",
        Some("not_implemented"),
        5,
        1,
    );
    foreign.session_id = OTHER_SESSION.to_string();

    AssessmentSnapshot {
        frameworks: vec![Framework {
            id: "fw-cmmc".to_string(),
            name: "CMMC Level 2".to_string(),
            version: Some("2.0".to_string()),
            description: None,
            total_controls: Some(110),
            total_objectives: Some(320),
            session_id: SESSION.to_string(),
        }],
        families: vec![
            family("fam-at", "AT", "Awareness and Training", Some(2)),
            family("fam-ac", "AC", "Access Control", Some(1)),
            family("fam-ir", "IR", "Incident Response", None),
        ],
        controls: vec![
            access,
            control(
                "ctl-312",
                "fam-ac",
                "3.1.2",
                "Limit transaction types",
                Some("partially_implemented"),
                5,
                2,
            ),
            awareness,
            control("ctl-322", "fam-at", "3.2.2", "Insider threat training", None, 1, 4),
            foreign,
        ],
        objectives: vec![AssessmentObjective {
            id: "obj-311a".to_string(),
            control_id: "ctl-311".to_string(),
            objective_number: "3.1.1[a]".to_string(),
            objective_text: "Authorized users are identified.".to_string(),
            status: Some("met".to_string()),
            notes: None,
            session_id: SESSION.to_string(),
        }],
        evidence: vec![
            evidence("evd-a", "ctl-311", "Access Control Policy", "2026-01-05T10:00:00"),
            evidence("evd-b", "ctl-311", "Account review log", "2026-01-09T08:30:00"),
        ],
        poam_items: vec![
            poam("poam-a", "ctl-312", "open", Some("high"), "2026-02-01", "2026-01-02T09:00:00"),
            poam("poam-b", "ctl-321", "in_progress", None, "2026-03-01", "2026-01-03T09:00:00"),
            poam("poam-c", "ctl-321", "completed", Some("low"), "2025-12-01", "2025-11-01T09:00:00"),
        ],
        boundary_assets: vec![
            asset("asset-a", "file-server", 1),
            asset("asset-b", "engineering-laptop", 1),
            asset("asset-c", "guest-kiosk", 0),
        ],
    }
}

pub(super) fn store() -> Arc<InMemoryAssessmentStore> {
    Arc::new(InMemoryAssessmentStore::from_snapshot(snapshot()))
}

pub(super) fn service() -> AssessmentService<InMemoryAssessmentStore> {
    AssessmentService::new(store())
}

pub(super) fn api() -> Arc<AssessmentApi<InMemoryAssessmentStore>> {
    Arc::new(AssessmentApi {
        service: service(),
        default_session: SESSION.to_string(),
        reference_date: Some(reference_date()),
    })
}

pub(super) async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}
