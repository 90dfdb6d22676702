use super::common::*;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::assessment::domain::{
    AssessmentObjective, BoundaryAsset, Control, ControlFamily, Evidence, Framework, PoamItem,
};
use crate::assessment::store::{AssessmentStore, StoreError};
use crate::assessment::{assessment_router, AssessmentApi, AssessmentService};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn with_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn dashboard_route_uses_pinned_reference_date() {
    let response = assessment_router(api())
        .oneshot(get("/api/v1/dashboard"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["sprs_score"], 104);
    assert_eq!(body["poam_summary"]["overdue"], 1);
    assert_eq!(body["family_heatmap"][1]["code"], "AC");
    assert_eq!(body["family_heatmap"][1]["color"], "#f59e0b");
    assert_eq!(body["score_trend"][5]["value"], 104);
}

#[tokio::test]
async fn dashboard_route_accepts_as_of_override() {
    let response = assessment_router(api())
        .oneshot(get("/api/v1/dashboard?as_of=2026-03-02"))
        .await
        .expect("router responds");
    let body = body_json(response).await;
    assert_eq!(body["poam_summary"]["overdue"], 2);
}

#[tokio::test]
async fn dashboard_route_rejects_malformed_as_of() {
    let response = assessment_router(api())
        .oneshot(get("/api/v1/dashboard?as_of=March"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn breakdown_route_honors_session_parameter() {
    let response = assessment_router(api())
        .oneshot(get("/api/v1/sprs/breakdown?session_id=demo-bravo"))
        .await
        .expect("router responds");
    let body = body_json(response).await;
    assert_eq!(body["base_score"], 110);
    assert_eq!(body["total_deduction"], 5);
    assert_eq!(body["sprs_score"], 105);
    assert_eq!(body["controls"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn control_routes_return_detail_and_not_found() {
    let router = assessment_router(api());

    let detail = router
        .clone()
        .oneshot(get("/api/v1/controls/ctl-311"))
        .await
        .expect("router responds");
    assert_eq!(detail.status(), StatusCode::OK);
    let body = body_json(detail).await;
    assert_eq!(body["control_number"], "3.1.1");
    assert_eq!(body["family_code"], "AC");
    assert_eq!(body["evidence"].as_array().map(Vec::len), Some(2));

    let missing = router
        .clone()
        .oneshot(get("/api/v1/controls/ctl-404"))
        .await
        .expect("router responds");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await["error"], "Control not found");

    let families = router
        .oneshot(get("/api/v1/controls/families"))
        .await
        .expect("router responds");
    assert_eq!(families.status(), StatusCode::OK);
    let body = body_json(families).await;
    assert_eq!(body[0]["family_code"], "IR");
    assert_eq!(body[1]["actual_control_count"], 2);
}

#[tokio::test]
async fn control_list_route_paginates() {
    let response = assessment_router(api())
        .oneshot(get("/api/v1/controls?per_page=2&page=2"))
        .await
        .expect("router responds");
    let body = body_json(response).await;
    assert_eq!(body["total"], 4);
    assert_eq!(body["page"], 2);
    assert_eq!(body["controls"][0]["id"], "ctl-321");
}

#[tokio::test]
async fn status_route_validates_and_updates() {
    let router = assessment_router(api());

    let rejected = router
        .clone()
        .oneshot(with_json(
            Method::PUT,
            "/api/v1/controls/ctl-322/status",
            json!({ "implementation_status": "done" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let accepted = router
        .clone()
        .oneshot(with_json(
            Method::PUT,
            "/api/v1/controls/ctl-312/status",
            json!({ "implementation_status": "implemented", "assessed_by": "auditor" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(accepted.status(), StatusCode::OK);
    let body = body_json(accepted).await;
    assert_eq!(body["implementation_status"], "implemented");
    assert!(body["last_assessed_date"].is_string());

    let breakdown = router
        .oneshot(get("/api/v1/sprs/breakdown"))
        .await
        .expect("router responds");
    assert_eq!(body_json(breakdown).await["sprs_score"], 107);
}

#[tokio::test]
async fn control_edit_route_stores_status_verbatim() {
    let router = assessment_router(api());

    let edited = router
        .clone()
        .oneshot(with_json(
            Method::PUT,
            "/api/v1/controls/ctl-322",
            json!({ "implementation_status": "retired", "assessor_notes": "superseded" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(edited.status(), StatusCode::OK);
    let body = body_json(edited).await;
    assert_eq!(body["implementation_status"], "retired");
    assert_eq!(body["assessor_notes"], "superseded");
    assert!(body["last_assessed_date"].is_string());

    let dashboard = router
        .oneshot(get("/api/v1/dashboard"))
        .await
        .expect("router responds");
    let body = body_json(dashboard).await;
    assert_eq!(body["sprs_score"], 104);
    assert_eq!(body["assessed_controls"], 4);
}

#[tokio::test]
async fn control_edit_route_clears_status_with_null() {
    let router = assessment_router(api());

    let edited = router
        .clone()
        .oneshot(with_json(
            Method::PUT,
            "/api/v1/controls/ctl-321",
            json!({ "implementation_status": null }),
        ))
        .await
        .expect("router responds");
    assert_eq!(edited.status(), StatusCode::OK);
    let body = body_json(edited).await;
    assert!(body["implementation_status"].is_null());
    assert!(body["last_assessed_date"].is_string());

    let breakdown = router
        .oneshot(get("/api/v1/sprs/breakdown"))
        .await
        .expect("router responds");
    assert_eq!(body_json(breakdown).await["sprs_score"], 107);
}

#[tokio::test]
async fn poam_routes_create_and_delete() {
    let router = assessment_router(api());

    let created = router
        .clone()
        .oneshot(with_json(
            Method::POST,
            "/api/v1/poam",
            json!({ "control_id": "ctl-321", "risk_level": "critical" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = body_json(created).await;
    let id = body["id"].as_str().expect("id assigned").to_string();
    assert_eq!(body["status"], "open");

    let orphan = router
        .clone()
        .oneshot(with_json(
            Method::POST,
            "/api/v1/poam",
            json!({ "control_id": "ctl-404" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(orphan.status(), StatusCode::NOT_FOUND);

    let listed = router
        .clone()
        .oneshot(get("/api/v1/poam?risk_level=critical"))
        .await
        .expect("router responds");
    let body = body_json(listed).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["control_number"], "3.2.1");

    let deleted = router
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/v1/poam/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(body_json(deleted).await["message"], "POA&M item deleted");
}

#[tokio::test]
async fn evidence_and_boundary_routes_round_out_crud() {
    let router = assessment_router(api());

    let evidence = router
        .clone()
        .oneshot(with_json(
            Method::POST,
            "/api/v1/evidence",
            json!({ "control_id": "ctl-311" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(evidence.status(), StatusCode::BAD_REQUEST);

    let asset = router
        .clone()
        .oneshot(with_json(
            Method::PUT,
            "/api/v1/boundary/asset-c",
            json!({ "in_scope": 1 }),
        ))
        .await
        .expect("router responds");
    assert_eq!(asset.status(), StatusCode::OK);

    let dashboard = router
        .oneshot(get("/api/v1/dashboard"))
        .await
        .expect("router responds");
    assert_eq!(body_json(dashboard).await["boundary_count"], 3);
}

struct UnavailableStore;

impl UnavailableStore {
    fn down<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl AssessmentStore for UnavailableStore {
    fn list_frameworks(&self, _: &str) -> Result<Vec<Framework>, StoreError> {
        Self::down()
    }
    fn get_framework(&self, _: &str, _: &str) -> Result<Framework, StoreError> {
        Self::down()
    }
    fn list_families(&self, _: &str) -> Result<Vec<ControlFamily>, StoreError> {
        Self::down()
    }
    fn list_controls(&self, _: &str) -> Result<Vec<Control>, StoreError> {
        Self::down()
    }
    fn get_control(&self, _: &str, _: &str) -> Result<Control, StoreError> {
        Self::down()
    }
    fn save_control(&self, _: Control) -> Result<(), StoreError> {
        Self::down()
    }
    fn list_objectives(&self, _: &str, _: &str) -> Result<Vec<AssessmentObjective>, StoreError> {
        Self::down()
    }
    fn list_evidence(&self, _: &str) -> Result<Vec<Evidence>, StoreError> {
        Self::down()
    }
    fn insert_evidence(&self, _: Evidence) -> Result<Evidence, StoreError> {
        Self::down()
    }
    fn delete_evidence(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Self::down()
    }
    fn list_poam_items(&self, _: &str) -> Result<Vec<PoamItem>, StoreError> {
        Self::down()
    }
    fn get_poam_item(&self, _: &str, _: &str) -> Result<PoamItem, StoreError> {
        Self::down()
    }
    fn insert_poam_item(&self, _: PoamItem) -> Result<PoamItem, StoreError> {
        Self::down()
    }
    fn save_poam_item(&self, _: PoamItem) -> Result<(), StoreError> {
        Self::down()
    }
    fn delete_poam_item(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Self::down()
    }
    fn list_boundary_assets(&self, _: &str) -> Result<Vec<BoundaryAsset>, StoreError> {
        Self::down()
    }
    fn get_boundary_asset(&self, _: &str, _: &str) -> Result<BoundaryAsset, StoreError> {
        Self::down()
    }
    fn insert_boundary_asset(&self, _: BoundaryAsset) -> Result<BoundaryAsset, StoreError> {
        Self::down()
    }
    fn save_boundary_asset(&self, _: BoundaryAsset) -> Result<(), StoreError> {
        Self::down()
    }
    fn delete_boundary_asset(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Self::down()
    }
}

#[tokio::test]
async fn store_outage_surfaces_as_internal_error() {
    let api = Arc::new(AssessmentApi {
        service: AssessmentService::new(Arc::new(UnavailableStore)),
        default_session: SESSION.to_string(),
        reference_date: Some(reference_date()),
    });
    let response = assessment_router(api)
        .oneshot(get("/api/v1/dashboard"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "store unavailable: database offline"
    );
}
