use std::sync::{Arc, Mutex};

use super::domain::{
    AssessmentObjective, AssessmentSnapshot, BoundaryAsset, Control, ControlFamily, Evidence,
    Framework, PoamItem,
};

/// Session-scoped access to assessment records. Every read is filtered by the
/// isolation key; records from other sessions are invisible.
pub trait AssessmentStore: Send + Sync {
    fn list_frameworks(&self, session: &str) -> Result<Vec<Framework>, StoreError>;
    fn get_framework(&self, session: &str, id: &str) -> Result<Framework, StoreError>;
    fn list_families(&self, session: &str) -> Result<Vec<ControlFamily>, StoreError>;
    fn list_controls(&self, session: &str) -> Result<Vec<Control>, StoreError>;
    fn get_control(&self, session: &str, id: &str) -> Result<Control, StoreError>;
    fn save_control(&self, control: Control) -> Result<(), StoreError>;
    fn list_objectives(
        &self,
        session: &str,
        control_id: &str,
    ) -> Result<Vec<AssessmentObjective>, StoreError>;
    fn list_evidence(&self, session: &str) -> Result<Vec<Evidence>, StoreError>;
    fn insert_evidence(&self, evidence: Evidence) -> Result<Evidence, StoreError>;
    fn delete_evidence(&self, session: &str, id: &str) -> Result<(), StoreError>;
    fn list_poam_items(&self, session: &str) -> Result<Vec<PoamItem>, StoreError>;
    fn get_poam_item(&self, session: &str, id: &str) -> Result<PoamItem, StoreError>;
    fn insert_poam_item(&self, item: PoamItem) -> Result<PoamItem, StoreError>;
    fn save_poam_item(&self, item: PoamItem) -> Result<(), StoreError>;
    fn delete_poam_item(&self, session: &str, id: &str) -> Result<(), StoreError>;
    fn list_boundary_assets(&self, session: &str) -> Result<Vec<BoundaryAsset>, StoreError>;
    fn get_boundary_asset(&self, session: &str, id: &str) -> Result<BoundaryAsset, StoreError>;
    fn insert_boundary_asset(&self, asset: BoundaryAsset) -> Result<BoundaryAsset, StoreError>;
    fn save_boundary_asset(&self, asset: BoundaryAsset) -> Result<(), StoreError>;
    fn delete_boundary_asset(&self, session: &str, id: &str) -> Result<(), StoreError>;

    fn count_in_scope_boundary_assets(&self, session: &str) -> Result<usize, StoreError> {
        Ok(self
            .list_boundary_assets(session)?
            .iter()
            .filter(|asset| asset.is_in_scope())
            .count())
    }
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} {id} already exists")]
    Conflict { entity: &'static str, id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

trait Record: Clone {
    const ENTITY: &'static str;
    fn id(&self) -> &str;
    fn session(&self) -> &str;
}

macro_rules! record {
    ($ty:ty, $entity:literal) => {
        impl Record for $ty {
            const ENTITY: &'static str = $entity;

            fn id(&self) -> &str {
                &self.id
            }

            fn session(&self) -> &str {
                &self.session_id
            }
        }
    };
}

record!(Framework, "Framework");
record!(Control, "Control");
record!(Evidence, "Evidence");
record!(PoamItem, "POA&M item");
record!(BoundaryAsset, "Boundary asset");

fn scoped<T: Record>(records: &[T], session: &str) -> Vec<T> {
    records
        .iter()
        .filter(|record| record.session() == session)
        .cloned()
        .collect()
}

fn find<T: Record>(records: &[T], session: &str, id: &str) -> Result<T, StoreError> {
    records
        .iter()
        .find(|record| record.session() == session && record.id() == id)
        .cloned()
        .ok_or_else(|| StoreError::NotFound {
            entity: T::ENTITY,
            id: id.to_string(),
        })
}

fn insert<T: Record>(records: &mut Vec<T>, record: T) -> Result<T, StoreError> {
    if records.iter().any(|existing| existing.id() == record.id()) {
        return Err(StoreError::Conflict {
            entity: T::ENTITY,
            id: record.id().to_string(),
        });
    }
    records.push(record.clone());
    Ok(record)
}

fn replace<T: Record>(records: &mut [T], record: T) -> Result<(), StoreError> {
    match records
        .iter_mut()
        .find(|existing| existing.session() == record.session() && existing.id() == record.id())
    {
        Some(slot) => {
            *slot = record;
            Ok(())
        }
        None => Err(StoreError::NotFound {
            entity: T::ENTITY,
            id: record.id().to_string(),
        }),
    }
}

fn remove<T: Record>(records: &mut Vec<T>, session: &str, id: &str) -> Result<(), StoreError> {
    let position = records
        .iter()
        .position(|record| record.session() == session && record.id() == id)
        .ok_or_else(|| StoreError::NotFound {
            entity: T::ENTITY,
            id: id.to_string(),
        })?;
    records.remove(position);
    Ok(())
}

/// Mutex-guarded store over an [`AssessmentSnapshot`]; cheap to clone and share.
#[derive(Default, Clone)]
pub struct InMemoryAssessmentStore {
    data: Arc<Mutex<AssessmentSnapshot>>,
}

impl InMemoryAssessmentStore {
    pub fn from_snapshot(snapshot: AssessmentSnapshot) -> Self {
        Self {
            data: Arc::new(Mutex::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> AssessmentSnapshot {
        self.data.lock().expect("store mutex poisoned").clone()
    }
}

impl AssessmentStore for InMemoryAssessmentStore {
    fn list_frameworks(&self, session: &str) -> Result<Vec<Framework>, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(scoped(&guard.frameworks, session))
    }

    fn get_framework(&self, session: &str, id: &str) -> Result<Framework, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        find(&guard.frameworks, session, id)
    }

    fn list_families(&self, session: &str) -> Result<Vec<ControlFamily>, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(guard
            .families
            .iter()
            .filter(|family| family.session_id == session)
            .cloned()
            .collect())
    }

    fn list_controls(&self, session: &str) -> Result<Vec<Control>, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(scoped(&guard.controls, session))
    }

    fn get_control(&self, session: &str, id: &str) -> Result<Control, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        find(&guard.controls, session, id)
    }

    fn save_control(&self, control: Control) -> Result<(), StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        replace(&mut guard.controls, control)
    }

    fn list_objectives(
        &self,
        session: &str,
        control_id: &str,
    ) -> Result<Vec<AssessmentObjective>, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(guard
            .objectives
            .iter()
            .filter(|objective| {
                objective.session_id == session && objective.control_id == control_id
            })
            .cloned()
            .collect())
    }

    fn list_evidence(&self, session: &str) -> Result<Vec<Evidence>, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(scoped(&guard.evidence, session))
    }

    fn insert_evidence(&self, evidence: Evidence) -> Result<Evidence, StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        insert(&mut guard.evidence, evidence)
    }

    fn delete_evidence(&self, session: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        remove(&mut guard.evidence, session, id)
    }

    fn list_poam_items(&self, session: &str) -> Result<Vec<PoamItem>, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(scoped(&guard.poam_items, session))
    }

    fn get_poam_item(&self, session: &str, id: &str) -> Result<PoamItem, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        find(&guard.poam_items, session, id)
    }

    fn insert_poam_item(&self, item: PoamItem) -> Result<PoamItem, StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        insert(&mut guard.poam_items, item)
    }

    fn save_poam_item(&self, item: PoamItem) -> Result<(), StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        replace(&mut guard.poam_items, item)
    }

    fn delete_poam_item(&self, session: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        remove(&mut guard.poam_items, session, id)
    }

    fn list_boundary_assets(&self, session: &str) -> Result<Vec<BoundaryAsset>, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        Ok(scoped(&guard.boundary_assets, session))
    }

    fn get_boundary_asset(&self, session: &str, id: &str) -> Result<BoundaryAsset, StoreError> {
        let guard = self.data.lock().expect("store mutex poisoned");
        find(&guard.boundary_assets, session, id)
    }

    fn insert_boundary_asset(&self, asset: BoundaryAsset) -> Result<BoundaryAsset, StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        insert(&mut guard.boundary_assets, asset)
    }

    fn save_boundary_asset(&self, asset: BoundaryAsset) -> Result<(), StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        replace(&mut guard.boundary_assets, asset)
    }

    fn delete_boundary_asset(&self, session: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.data.lock().expect("store mutex poisoned");
        remove(&mut guard.boundary_assets, session, id)
    }
}
