use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::service::{
    AssessmentService, AssessmentServiceError, BoundaryChanges, ControlChanges, ControlQuery,
    NewEvidence, PoamChanges, StatusUpdate,
};
use super::store::{AssessmentStore, StoreError};

/// Shared state behind the assessment routes.
pub struct AssessmentApi<S> {
    pub service: AssessmentService<S>,
    pub default_session: String,
    /// Overdue cutoff for dashboards; falls back to the current local date.
    pub reference_date: Option<NaiveDate>,
}

impl<S> AssessmentApi<S> {
    fn session(&self, requested: Option<String>) -> String {
        requested
            .filter(|session| !session.is_empty())
            .unwrap_or_else(|| self.default_session.clone())
    }
}

type ApiState<S> = State<Arc<AssessmentApi<S>>>;

/// Router builder exposing the assessment resources.
pub fn assessment_router<S>(api: Arc<AssessmentApi<S>>) -> Router
where
    S: AssessmentStore + 'static,
{
    Router::new()
        .route("/api/v1/dashboard", get(dashboard_handler::<S>))
        .route("/api/v1/sprs/breakdown", get(breakdown_handler::<S>))
        .route("/api/v1/frameworks", get(list_frameworks_handler::<S>))
        .route(
            "/api/v1/frameworks/:framework_id",
            get(framework_detail_handler::<S>),
        )
        .route("/api/v1/controls", get(list_controls_handler::<S>))
        .route("/api/v1/controls/families", get(family_summaries_handler::<S>))
        .route(
            "/api/v1/controls/:control_id",
            get(control_detail_handler::<S>).put(update_control_handler::<S>),
        )
        .route(
            "/api/v1/controls/:control_id/status",
            put(update_status_handler::<S>),
        )
        .route(
            "/api/v1/evidence",
            get(list_evidence_handler::<S>).post(create_evidence_handler::<S>),
        )
        .route(
            "/api/v1/evidence/:evidence_id",
            axum::routing::delete(delete_evidence_handler::<S>),
        )
        .route(
            "/api/v1/poam",
            get(list_poam_handler::<S>).post(create_poam_handler::<S>),
        )
        .route(
            "/api/v1/poam/:poam_id",
            put(update_poam_handler::<S>).delete(delete_poam_handler::<S>),
        )
        .route(
            "/api/v1/boundary",
            get(list_boundary_handler::<S>).post(create_boundary_handler::<S>),
        )
        .route(
            "/api/v1/boundary/:asset_id",
            put(update_boundary_handler::<S>).delete(delete_boundary_handler::<S>),
        )
        .with_state(api)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SessionParams {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DashboardParams {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    as_of: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ControlListParams {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    family_id: Option<String>,
    #[serde(default)]
    implementation_status: Option<String>,
    #[serde(default)]
    control_type: Option<String>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    per_page: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EvidenceParams {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    control_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PoamParams {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    risk_level: Option<String>,
}

fn now_iso() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

fn error_response(error: AssessmentServiceError) -> Response {
    let status = match &error {
        AssessmentServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        AssessmentServiceError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
        AssessmentServiceError::Store(StoreError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, AssessmentServiceError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

fn deleted(result: Result<(), AssessmentServiceError>, message: &str) -> Response {
    respond(StatusCode::OK, result.map(|()| json!({ "message": message })))
}

pub(crate) async fn dashboard_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<DashboardParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let reference_date = match params.as_of.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return error_response(AssessmentServiceError::Validation(format!(
                    "as_of '{raw}' must be formatted as YYYY-MM-DD"
                )))
            }
        },
        _ => api
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive()),
    };
    let session = api.session(params.session_id);
    respond(StatusCode::OK, api.service.dashboard(&session, reference_date))
}

pub(crate) async fn breakdown_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(StatusCode::OK, api.service.score_breakdown(&session))
}

pub(crate) async fn list_frameworks_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(StatusCode::OK, api.service.list_frameworks(&session))
}

pub(crate) async fn framework_detail_handler<S>(
    State(api): ApiState<S>,
    Path(framework_id): Path<String>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(
        StatusCode::OK,
        api.service.framework_detail(&session, &framework_id),
    )
}

pub(crate) async fn list_controls_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<ControlListParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let ControlListParams {
        session_id,
        family_id,
        implementation_status,
        control_type,
        search,
        page,
        per_page,
    } = params;
    let session = api.session(session_id);
    let query = ControlQuery {
        family_id,
        implementation_status,
        control_type,
        search,
        page,
        per_page,
    };
    respond(StatusCode::OK, api.service.list_controls(&session, &query))
}

pub(crate) async fn family_summaries_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(StatusCode::OK, api.service.family_summaries(&session))
}

pub(crate) async fn control_detail_handler<S>(
    State(api): ApiState<S>,
    Path(control_id): Path<String>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(StatusCode::OK, api.service.control_detail(&session, &control_id))
}

pub(crate) async fn update_control_handler<S>(
    State(api): ApiState<S>,
    Path(control_id): Path<String>,
    Query(params): Query<SessionParams>,
    Json(changes): Json<ControlChanges>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(
        StatusCode::OK,
        api.service
            .update_control(&session, &control_id, changes, &now_iso()),
    )
}

pub(crate) async fn update_status_handler<S>(
    State(api): ApiState<S>,
    Path(control_id): Path<String>,
    Query(params): Query<SessionParams>,
    Json(update): Json<StatusUpdate>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(
        StatusCode::OK,
        api.service
            .update_control_status(&session, &control_id, update, &now_iso()),
    )
}

pub(crate) async fn list_evidence_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<EvidenceParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    let control_id = params.control_id.filter(|id| !id.is_empty());
    respond(
        StatusCode::OK,
        api.service.list_evidence(&session, control_id.as_deref()),
    )
}

pub(crate) async fn create_evidence_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<SessionParams>,
    Json(request): Json<NewEvidence>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(
        StatusCode::CREATED,
        api.service.create_evidence(&session, request, &now_iso()),
    )
}

pub(crate) async fn delete_evidence_handler<S>(
    State(api): ApiState<S>,
    Path(evidence_id): Path<String>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    deleted(
        api.service.delete_evidence(&session, &evidence_id),
        "Evidence deleted",
    )
}

pub(crate) async fn list_poam_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<PoamParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    let status = params.status.filter(|value| !value.is_empty());
    let risk_level = params.risk_level.filter(|value| !value.is_empty());
    respond(
        StatusCode::OK,
        api.service
            .list_poam(&session, status.as_deref(), risk_level.as_deref()),
    )
}

pub(crate) async fn create_poam_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<SessionParams>,
    Json(changes): Json<PoamChanges>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(
        StatusCode::CREATED,
        api.service.create_poam(&session, changes, &now_iso()),
    )
}

pub(crate) async fn update_poam_handler<S>(
    State(api): ApiState<S>,
    Path(poam_id): Path<String>,
    Query(params): Query<SessionParams>,
    Json(changes): Json<PoamChanges>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(
        StatusCode::OK,
        api.service
            .update_poam(&session, &poam_id, changes, &now_iso()),
    )
}

pub(crate) async fn delete_poam_handler<S>(
    State(api): ApiState<S>,
    Path(poam_id): Path<String>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    deleted(
        api.service.delete_poam(&session, &poam_id),
        "POA&M item deleted",
    )
}

pub(crate) async fn list_boundary_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(StatusCode::OK, api.service.list_boundary(&session))
}

pub(crate) async fn create_boundary_handler<S>(
    State(api): ApiState<S>,
    Query(params): Query<SessionParams>,
    Json(changes): Json<BoundaryChanges>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(
        StatusCode::CREATED,
        api.service.create_boundary(&session, changes),
    )
}

pub(crate) async fn update_boundary_handler<S>(
    State(api): ApiState<S>,
    Path(asset_id): Path<String>,
    Query(params): Query<SessionParams>,
    Json(changes): Json<BoundaryChanges>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    respond(
        StatusCode::OK,
        api.service.update_boundary(&session, &asset_id, changes),
    )
}

pub(crate) async fn delete_boundary_handler<S>(
    State(api): ApiState<S>,
    Path(asset_id): Path<String>,
    Query(params): Query<SessionParams>,
) -> Response
where
    S: AssessmentStore + 'static,
{
    let session = api.session(params.session_id);
    deleted(
        api.service.delete_boundary(&session, &asset_id),
        "Boundary asset deleted",
    )
}
