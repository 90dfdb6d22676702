use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use super::dashboard::DashboardSummary;
use super::domain::{
    AssessmentObjective, BoundaryAsset, Control, ControlFamily, Evidence, Framework,
    ImplementationStatus, PoamItem,
};
use super::scoring::{ScoreBreakdown, SprsCalculator};
use super::store::{AssessmentStore, StoreError};

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_record_id(prefix: &str) -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

const DEFAULT_PER_PAGE: usize = 50;

/// Filters accepted by the control listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlQuery {
    #[serde(default)]
    pub family_id: Option<String>,
    #[serde(default)]
    pub implementation_status: Option<String>,
    #[serde(default)]
    pub control_type: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlRow {
    #[serde(flatten)]
    pub control: Control,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlPage {
    pub controls: Vec<ControlRow>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlDetail {
    #[serde(flatten)]
    pub row: ControlRow,
    pub objectives: Vec<AssessmentObjective>,
    pub evidence: Vec<Evidence>,
    pub poam_items: Vec<PoamItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyStatusSummary {
    #[serde(flatten)]
    pub family: ControlFamily,
    pub actual_control_count: usize,
    pub status_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameworkDetail {
    #[serde(flatten)]
    pub framework: Framework,
    pub families: Vec<ControlFamily>,
}

/// A record annotated with the number and title of the control it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct Linked<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub implementation_status: Option<String>,
    #[serde(default)]
    pub assessed_by: Option<String>,
}

/// Free-form edit of a control's assessment fields. Statuses are stored as given.
///
/// Every field is a patch: `None` leaves the record alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlChanges {
    #[serde(default, deserialize_with = "present")]
    pub implementation_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub implementation_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub assessor_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub last_assessed_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub assessed_by: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub plain_english: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub guidance_text: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEvidence {
    #[serde(default)]
    pub control_id: Option<String>,
    #[serde(default)]
    pub evidence_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

/// Body of a POA&M create or update. Fields patch like [`ControlChanges`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoamChanges {
    #[serde(default)]
    pub control_id: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub weakness_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub remediation_plan: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub risk_level: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub responsible_person: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub responsible_team: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub planned_start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub planned_completion_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub actual_completion_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub estimated_cost: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub cost_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub milestones: Option<Option<String>>,
}

/// Body of a boundary asset create or update. Fields patch like [`ControlChanges`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundaryChanges {
    #[serde(default, deserialize_with = "present")]
    pub boundary_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub asset_tracker_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub asset_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub asset_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub data_classification: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub in_scope: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

/// Keeps an explicit JSON `null` apart from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read and write operations over one store, scoped per session.
pub struct AssessmentService<S> {
    store: Arc<S>,
}

impl<S> AssessmentService<S>
where
    S: AssessmentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn dashboard(
        &self,
        session: &str,
        reference_date: NaiveDate,
    ) -> Result<DashboardSummary, AssessmentServiceError> {
        let controls = self.store.list_controls(session)?;
        let families = self.store.list_families(session)?;
        let poam_items = self.store.list_poam_items(session)?;
        let boundary_count = self.store.count_in_scope_boundary_assets(session)?;

        let summary = DashboardSummary::build(
            &controls,
            &families,
            &poam_items,
            boundary_count,
            reference_date,
        );
        debug!(
            session,
            %reference_date,
            sprs_score = summary.sprs_score,
            controls = summary.total_controls,
            "dashboard aggregated"
        );
        Ok(summary)
    }

    pub fn score_breakdown(&self, session: &str) -> Result<ScoreBreakdown, AssessmentServiceError> {
        let controls = self.store.list_controls(session)?;
        let breakdown = SprsCalculator::breakdown(&controls);
        debug!(session, sprs_score = breakdown.sprs_score, "score breakdown computed");
        Ok(breakdown)
    }

    pub fn list_frameworks(&self, session: &str) -> Result<Vec<Framework>, AssessmentServiceError> {
        Ok(self.store.list_frameworks(session)?)
    }

    pub fn framework_detail(
        &self,
        session: &str,
        framework_id: &str,
    ) -> Result<FrameworkDetail, AssessmentServiceError> {
        let framework = self.store.get_framework(session, framework_id)?;
        let mut families: Vec<ControlFamily> = self
            .store
            .list_families(session)?
            .into_iter()
            .filter(|family| family.framework_id == framework_id)
            .collect();
        families.sort_by_key(ControlFamily::sort_key);
        Ok(FrameworkDetail {
            framework,
            families,
        })
    }

    pub fn list_controls(
        &self,
        session: &str,
        query: &ControlQuery,
    ) -> Result<ControlPage, AssessmentServiceError> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        let mut matching: Vec<Control> = self
            .store
            .list_controls(session)?
            .into_iter()
            .filter(|control| {
                non_empty(&query.family_id).map_or(true, |id| control.family_id == id)
            })
            .filter(|control| {
                non_empty(&query.implementation_status)
                    .map_or(true, |status| control.implementation_status.as_deref() == Some(status))
            })
            .filter(|control| {
                non_empty(&query.control_type)
                    .map_or(true, |kind| control.control_type.as_deref() == Some(kind))
            })
            .filter(|control| search.as_deref().map_or(true, |term| matches_search(control, term)))
            .collect();
        matching.sort_by_key(|control| control.sort_order.unwrap_or(0));

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
        let total = matching.len();
        let families = self.store.list_families(session)?;

        let controls = matching
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .map(|control| with_family(control, &families))
            .collect();

        Ok(ControlPage {
            controls,
            total,
            page,
            per_page,
        })
    }

    pub fn control_detail(
        &self,
        session: &str,
        control_id: &str,
    ) -> Result<ControlDetail, AssessmentServiceError> {
        let control = self.store.get_control(session, control_id)?;
        let families = self.store.list_families(session)?;
        let objectives = self.store.list_objectives(session, control_id)?;
        let evidence = self
            .store
            .list_evidence(session)?
            .into_iter()
            .filter(|item| item.control_id == control_id)
            .collect();
        let poam_items = self
            .store
            .list_poam_items(session)?
            .into_iter()
            .filter(|item| item.control_id == control_id)
            .collect();

        Ok(ControlDetail {
            row: with_family(control, &families),
            objectives,
            evidence,
            poam_items,
        })
    }

    /// Applies the present fields. A body carrying `implementation_status`, even as
    /// `null`, but no `last_assessed_date` key is stamped with `now`.
    pub fn update_control(
        &self,
        session: &str,
        control_id: &str,
        changes: ControlChanges,
        now: &str,
    ) -> Result<Control, AssessmentServiceError> {
        let mut control = self.store.get_control(session, control_id)?;
        let ControlChanges {
            implementation_status,
            implementation_notes,
            assessor_notes,
            last_assessed_date,
            assessed_by,
            plain_english,
            guidance_text,
        } = changes;

        if implementation_status.is_some() && last_assessed_date.is_none() {
            control.last_assessed_date = Some(now.to_string());
        }
        overwrite(&mut control.implementation_status, implementation_status);
        overwrite(&mut control.implementation_notes, implementation_notes);
        overwrite(&mut control.assessor_notes, assessor_notes);
        overwrite(&mut control.last_assessed_date, last_assessed_date);
        overwrite(&mut control.assessed_by, assessed_by);
        overwrite(&mut control.plain_english, plain_english);
        overwrite(&mut control.guidance_text, guidance_text);

        self.store.save_control(control.clone())?;
        info!(session, control = %control.control_number, "control updated");
        Ok(control)
    }

    /// Record an assessor's verdict. Only canonical statuses are accepted here.
    pub fn update_control_status(
        &self,
        session: &str,
        control_id: &str,
        update: StatusUpdate,
        assessed_at: &str,
    ) -> Result<Control, AssessmentServiceError> {
        let mut control = self.store.get_control(session, control_id)?;
        let requested = update.implementation_status.ok_or_else(|| {
            AssessmentServiceError::Validation("implementation_status is required".to_string())
        })?;
        let status = ImplementationStatus::parse(&requested).ok_or_else(|| {
            warn!(session, control_id, status = %requested, "rejected control status");
            let allowed: Vec<&str> = ImplementationStatus::ordered()
                .into_iter()
                .map(ImplementationStatus::as_str)
                .collect();
            AssessmentServiceError::Validation(format!(
                "Invalid status. Must be one of: {}",
                allowed.join(", ")
            ))
        })?;

        control.implementation_status = Some(status.as_str().to_string());
        control.last_assessed_date = Some(assessed_at.to_string());
        if let Some(assessor) = update.assessed_by {
            control.assessed_by = Some(assessor);
        }

        self.store.save_control(control.clone())?;
        info!(
            session,
            control = %control.control_number,
            status = status.as_str(),
            "control status updated"
        );
        Ok(control)
    }

    pub fn family_summaries(
        &self,
        session: &str,
    ) -> Result<Vec<FamilyStatusSummary>, AssessmentServiceError> {
        let controls = self.store.list_controls(session)?;
        let mut families = self.store.list_families(session)?;
        families.sort_by_key(ControlFamily::sort_key);

        Ok(families
            .into_iter()
            .map(|family| {
                let mut status_breakdown = BTreeMap::new();
                let mut actual_control_count = 0;
                for control in controls.iter().filter(|c| c.family_id == family.id) {
                    actual_control_count += 1;
                    *status_breakdown
                        .entry(control.status().as_str().to_string())
                        .or_insert(0) += 1;
                }
                FamilyStatusSummary {
                    family,
                    actual_control_count,
                    status_breakdown,
                }
            })
            .collect())
    }

    pub fn list_evidence(
        &self,
        session: &str,
        control_id: Option<&str>,
    ) -> Result<Vec<Linked<Evidence>>, AssessmentServiceError> {
        let controls = self.store.list_controls(session)?;
        let mut evidence: Vec<Evidence> = self
            .store
            .list_evidence(session)?
            .into_iter()
            .filter(|item| control_id.map_or(true, |id| item.control_id == id))
            .collect();
        evidence.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

        Ok(evidence
            .into_iter()
            .map(|item| {
                let control_id = item.control_id.clone();
                linked(item, &control_id, &controls)
            })
            .collect())
    }

    pub fn create_evidence(
        &self,
        session: &str,
        request: NewEvidence,
        uploaded_at: &str,
    ) -> Result<Evidence, AssessmentServiceError> {
        let control_id = required(request.control_id, "control_id")?;
        let title = required(request.title, "title")?;
        self.store.get_control(session, &control_id)?;

        let evidence = Evidence {
            id: next_record_id("evd"),
            control_id,
            evidence_type: request
                .evidence_type
                .unwrap_or_else(|| "document".to_string()),
            title,
            description: request.description,
            file_path: request.file_path,
            external_url: request.external_url,
            uploaded_at: uploaded_at.to_string(),
            uploaded_by: request.uploaded_by.unwrap_or_else(|| "admin".to_string()),
            session_id: session.to_string(),
        };

        let stored = self.store.insert_evidence(evidence)?;
        info!(session, evidence = %stored.id, control = %stored.control_id, "evidence attached");
        Ok(stored)
    }

    pub fn delete_evidence(&self, session: &str, id: &str) -> Result<(), AssessmentServiceError> {
        self.store.delete_evidence(session, id)?;
        info!(session, evidence = id, "evidence deleted");
        Ok(())
    }

    pub fn list_poam(
        &self,
        session: &str,
        status: Option<&str>,
        risk_level: Option<&str>,
    ) -> Result<Vec<Linked<PoamItem>>, AssessmentServiceError> {
        let controls = self.store.list_controls(session)?;
        let mut items: Vec<PoamItem> = self
            .store
            .list_poam_items(session)?
            .into_iter()
            .filter(|item| status.map_or(true, |wanted| item.status.as_deref() == Some(wanted)))
            .filter(|item| {
                risk_level.map_or(true, |wanted| item.risk_level.as_deref() == Some(wanted))
            })
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(items
            .into_iter()
            .map(|item| {
                let control_id = item.control_id.clone();
                linked(item, &control_id, &controls)
            })
            .collect())
    }

    pub fn create_poam(
        &self,
        session: &str,
        changes: PoamChanges,
        now: &str,
    ) -> Result<PoamItem, AssessmentServiceError> {
        let control_id = required(changes.control_id.clone(), "control_id")?;
        self.store.get_control(session, &control_id)?;

        let mut item = PoamItem {
            id: next_record_id("poam"),
            control_id,
            risk_level: Some("moderate".to_string()),
            status: Some("open".to_string()),
            milestones: Some("[]".to_string()),
            created_at: now.to_string(),
            updated_at: now.to_string(),
            session_id: session.to_string(),
            ..PoamItem::default()
        };
        apply_poam_changes(&mut item, changes);

        let stored = self.store.insert_poam_item(item)?;
        info!(session, poam = %stored.id, control = %stored.control_id, "POA&M item opened");
        Ok(stored)
    }

    pub fn update_poam(
        &self,
        session: &str,
        id: &str,
        changes: PoamChanges,
        now: &str,
    ) -> Result<PoamItem, AssessmentServiceError> {
        let mut item = self.store.get_poam_item(session, id)?;
        apply_poam_changes(&mut item, changes);
        item.updated_at = now.to_string();
        self.store.save_poam_item(item.clone())?;
        info!(session, poam = id, "POA&M item updated");
        Ok(item)
    }

    pub fn delete_poam(&self, session: &str, id: &str) -> Result<(), AssessmentServiceError> {
        self.store.delete_poam_item(session, id)?;
        info!(session, poam = id, "POA&M item deleted");
        Ok(())
    }

    pub fn list_boundary(&self, session: &str) -> Result<Vec<BoundaryAsset>, AssessmentServiceError> {
        Ok(self.store.list_boundary_assets(session)?)
    }

    pub fn create_boundary(
        &self,
        session: &str,
        changes: BoundaryChanges,
    ) -> Result<BoundaryAsset, AssessmentServiceError> {
        let mut asset = BoundaryAsset {
            id: next_record_id("asset"),
            boundary_name: None,
            asset_tracker_id: None,
            asset_name: None,
            asset_type: None,
            data_classification: None,
            in_scope: 1,
            notes: None,
            session_id: session.to_string(),
        };
        apply_boundary_changes(&mut asset, changes);

        let stored = self.store.insert_boundary_asset(asset)?;
        info!(session, asset = %stored.id, in_scope = stored.is_in_scope(), "boundary asset added");
        Ok(stored)
    }

    pub fn update_boundary(
        &self,
        session: &str,
        id: &str,
        changes: BoundaryChanges,
    ) -> Result<BoundaryAsset, AssessmentServiceError> {
        let mut asset = self.store.get_boundary_asset(session, id)?;
        apply_boundary_changes(&mut asset, changes);
        self.store.save_boundary_asset(asset.clone())?;
        info!(session, asset = id, "boundary asset updated");
        Ok(asset)
    }

    pub fn delete_boundary(&self, session: &str, id: &str) -> Result<(), AssessmentServiceError> {
        self.store.delete_boundary_asset(session, id)?;
        info!(session, asset = id, "boundary asset deleted");
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn required(value: Option<String>, field: &str) -> Result<String, AssessmentServiceError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AssessmentServiceError::Validation(format!("{field} is required")))
}

fn matches_search(control: &Control, term: &str) -> bool {
    [
        Some(control.control_number.as_str()),
        Some(control.title.as_str()),
        control.requirement_text.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(term))
}

fn with_family(control: Control, families: &[ControlFamily]) -> ControlRow {
    let family = families.iter().find(|family| family.id == control.family_id);
    ControlRow {
        family_code: family.map(|family| family.family_code.clone()),
        family_name: family.map(|family| family.name.clone()),
        control,
    }
}

fn linked<T>(record: T, control_id: &str, controls: &[Control]) -> Linked<T> {
    let control = controls.iter().find(|control| control.id == control_id);
    Linked {
        record,
        control_number: control.map(|control| control.control_number.clone()),
        control_title: control.map(|control| control.title.clone()),
    }
}

fn apply_poam_changes(item: &mut PoamItem, changes: PoamChanges) {
    let PoamChanges {
        control_id: _,
        weakness_description,
        remediation_plan,
        risk_level,
        responsible_person,
        responsible_team,
        planned_start_date,
        planned_completion_date,
        actual_completion_date,
        estimated_cost,
        cost_notes,
        status,
        milestones,
    } = changes;

    overwrite(&mut item.weakness_description, weakness_description);
    overwrite(&mut item.remediation_plan, remediation_plan);
    overwrite(&mut item.risk_level, risk_level);
    overwrite(&mut item.responsible_person, responsible_person);
    overwrite(&mut item.responsible_team, responsible_team);
    overwrite(&mut item.planned_start_date, planned_start_date);
    overwrite(&mut item.planned_completion_date, planned_completion_date);
    overwrite(&mut item.actual_completion_date, actual_completion_date);
    overwrite(&mut item.estimated_cost, estimated_cost);
    overwrite(&mut item.cost_notes, cost_notes);
    overwrite(&mut item.status, status);
    overwrite(&mut item.milestones, milestones);
}

fn apply_boundary_changes(asset: &mut BoundaryAsset, changes: BoundaryChanges) {
    let BoundaryChanges {
        boundary_name,
        asset_tracker_id,
        asset_name,
        asset_type,
        data_classification,
        in_scope,
        notes,
    } = changes;

    overwrite(&mut asset.boundary_name, boundary_name);
    overwrite(&mut asset.asset_tracker_id, asset_tracker_id);
    overwrite(&mut asset.asset_name, asset_name);
    overwrite(&mut asset.asset_type, asset_type);
    overwrite(&mut asset.data_classification, data_classification);
    overwrite(&mut asset.notes, notes);
    // A cleared flag no longer reads as in scope.
    if let Some(in_scope) = in_scope {
        asset.in_scope = in_scope.unwrap_or(0);
    }
}

fn overwrite<T>(slot: &mut Option<T>, patch: Option<Option<T>>) {
    if let Some(value) = patch {
        *slot = value;
    }
}
