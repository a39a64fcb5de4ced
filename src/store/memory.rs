//! In-memory store backend.
//!
//! Backs local development and tests with the same contract as the
//! Postgres backend. All state lives behind one lock; snapshots publish
//! inside the lock scope, so subscribers observe writes in the order
//! they were applied.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::{watch, Mutex};

use crate::errors::CrewdeskError;
use crate::models::{
    CrewRecord, CrewStatus, NewApplication, NewAssignment, RecordId, VesselAssignment,
};
use crate::store::{CrewStore, Snapshots};

use async_trait::async_trait;

#[derive(Debug, Default)]
struct State {
    crew: BTreeMap<RecordId, CrewRecord>,
    assignments: BTreeMap<RecordId, VesselAssignment>,
}

/// Record store holding everything in process memory.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    crew_tx: watch::Sender<Arc<Vec<CrewRecord>>>,
    assignment_tx: watch::Sender<Arc<Vec<VesselAssignment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (crew_tx, _) = watch::channel(Arc::new(Vec::new()));
        let (assignment_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            state: Mutex::new(State::default()),
            crew_tx,
            assignment_tx,
        }
    }

    /// Preload records, for tests and local fixtures.
    pub async fn seed_crew(&self, records: Vec<CrewRecord>) {
        let mut state = self.state.lock().await;
        for record in records {
            state.crew.insert(record.id.clone(), record);
        }
        self.publish_crew(&state);
    }

    fn publish_crew(&self, state: &State) {
        let snapshot: Vec<CrewRecord> = state.crew.values().cloned().collect();
        self.crew_tx.send_replace(Arc::new(snapshot));
    }

    fn publish_assignments(&self, state: &State) {
        let snapshot: Vec<VesselAssignment> = state.assignments.values().cloned().collect();
        self.assignment_tx.send_replace(Arc::new(snapshot));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrewStore for MemoryStore {
    fn watch_crew(&self) -> Snapshots<CrewRecord> {
        Snapshots::new(self.crew_tx.subscribe())
    }

    fn watch_assignments(&self) -> Snapshots<VesselAssignment> {
        Snapshots::new(self.assignment_tx.subscribe())
    }

    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<CrewRecord, CrewdeskError> {
        let mut state = self.state.lock().await;
        let record = application.into_record(RecordId::generate(), Utc::now());
        state.crew.insert(record.id.clone(), record.clone());
        self.publish_crew(&state);
        Ok(record)
    }

    async fn get_record(&self, id: &RecordId) -> Result<CrewRecord, CrewdeskError> {
        let state = self.state.lock().await;
        state
            .crew
            .get(id)
            .cloned()
            .ok_or_else(|| CrewdeskError::RecordNotFound(id.to_string()))
    }

    async fn update_record(&self, record: CrewRecord) -> Result<(), CrewdeskError> {
        let mut state = self.state.lock().await;
        if !state.crew.contains_key(&record.id) {
            return Err(CrewdeskError::RecordNotFound(record.id.to_string()));
        }
        state.crew.insert(record.id.clone(), record);
        self.publish_crew(&state);
        Ok(())
    }

    async fn set_status(&self, id: &RecordId, status: CrewStatus) -> Result<(), CrewdeskError> {
        let mut state = self.state.lock().await;
        let record = state
            .crew
            .get_mut(id)
            .ok_or_else(|| CrewdeskError::RecordNotFound(id.to_string()))?;
        record.status = status;
        self.publish_crew(&state);
        Ok(())
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), CrewdeskError> {
        let mut state = self.state.lock().await;
        if state.crew.remove(id).is_none() {
            return Err(CrewdeskError::RecordNotFound(id.to_string()));
        }
        state
            .assignments
            .retain(|_, assignment| assignment.crew_id != *id);
        self.publish_crew(&state);
        self.publish_assignments(&state);
        Ok(())
    }

    async fn assign_vessel(
        &self,
        assignment: NewAssignment,
    ) -> Result<VesselAssignment, CrewdeskError> {
        let mut state = self.state.lock().await;
        let crew = state
            .crew
            .get_mut(&assignment.crew_id)
            .ok_or_else(|| CrewdeskError::RecordNotFound(assignment.crew_id.to_string()))?;

        crew.open_sea_service(
            &assignment.vessel_name,
            &assignment.vessel_type,
            &assignment.principal,
            assignment.signed_on,
        );
        let stored = VesselAssignment {
            id: RecordId::generate(),
            crew_id: assignment.crew_id.clone(),
            crew_name: crew.full_name.clone(),
            vessel_name: assignment.vessel_name,
            vessel_type: assignment.vessel_type,
            principal: assignment.principal,
            signed_on: Some(assignment.signed_on),
            signed_off: None,
        };
        state.assignments.insert(stored.id.clone(), stored.clone());
        self.publish_crew(&state);
        self.publish_assignments(&state);
        Ok(stored)
    }

    async fn end_assignment(
        &self,
        assignment_id: &RecordId,
        signed_off: NaiveDate,
    ) -> Result<(), CrewdeskError> {
        let mut state = self.state.lock().await;
        let assignment = state
            .assignments
            .remove(assignment_id)
            .ok_or_else(|| CrewdeskError::RecordNotFound(assignment_id.to_string()))?;
        if let Some(crew) = state.crew.get_mut(&assignment.crew_id) {
            crew.close_sea_service(&assignment.vessel_name, assignment.signed_on, signed_off);
        }
        self.publish_crew(&state);
        self.publish_assignments(&state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(name: &str, rank: &str) -> NewApplication {
        NewApplication {
            full_name: name.to_string(),
            rank: rank.to_string(),
            ..NewApplication::default()
        }
    }

    fn posting(crew_id: &RecordId, vessel: &str) -> NewAssignment {
        NewAssignment {
            crew_id: crew_id.clone(),
            vessel_name: vessel.to_string(),
            vessel_type: "Bulk Carrier".to_string(),
            principal: "Aurora Shipping".to_string(),
            signed_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn created_records_start_pending_and_reach_watchers() {
        let store = MemoryStore::new();
        let mut snapshots = store.watch_crew();
        assert!(snapshots.latest().is_empty());

        let created = store
            .create_application(application("Anna Cruz", "Chief Mate"))
            .await
            .unwrap();
        assert_eq!(created.status, CrewStatus::Pending);
        assert!(created.applied_at.is_some());

        let snapshot = snapshots.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].full_name, "Anna Cruz");
    }

    #[tokio::test]
    async fn every_snapshot_is_the_complete_collection() {
        let store = MemoryStore::new();
        let mut snapshots = store.watch_crew();

        store
            .create_application(application("Anna Cruz", "Chief Mate"))
            .await
            .unwrap();
        store
            .create_application(application("Juan Ann", "Able Seaman"))
            .await
            .unwrap();

        let snapshot = snapshots.next().await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn status_changes_are_visible_in_the_next_snapshot() {
        let store = MemoryStore::new();
        let created = store
            .create_application(application("Anna Cruz", "Chief Mate"))
            .await
            .unwrap();

        store
            .set_status(&created.id, CrewStatus::Passed)
            .await
            .unwrap();

        let mut snapshots = store.watch_crew();
        assert_eq!(snapshots.latest()[0].status, CrewStatus::Passed);
    }

    #[tokio::test]
    async fn assignment_writes_both_views_together() {
        let store = MemoryStore::new();
        let crew = store
            .create_application(application("Anna Cruz", "Chief Mate"))
            .await
            .unwrap();

        let assignment = store
            .assign_vessel(posting(&crew.id, "MV Coral Sea"))
            .await
            .unwrap();
        assert_eq!(assignment.crew_name, "Anna Cruz");
        assert!(assignment.signed_off.is_none());

        let record = store.get_record(&crew.id).await.unwrap();
        assert_eq!(record.sea_service.len(), 1);
        assert_eq!(record.sea_service[0].vessel_name, "MV Coral Sea");
        assert!(record.sea_service[0].signed_off.is_none());

        let mut assignments = store.watch_assignments();
        assert_eq!(assignments.latest().len(), 1);
    }

    #[tokio::test]
    async fn ending_an_assignment_closes_the_sea_service_entry() {
        let store = MemoryStore::new();
        let crew = store
            .create_application(application("Anna Cruz", "Chief Mate"))
            .await
            .unwrap();
        let assignment = store
            .assign_vessel(posting(&crew.id, "MV Coral Sea"))
            .await
            .unwrap();

        let off = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        store.end_assignment(&assignment.id, off).await.unwrap();

        let record = store.get_record(&crew.id).await.unwrap();
        assert_eq!(record.sea_service[0].signed_off, Some(off));

        let mut assignments = store.watch_assignments();
        assert!(assignments.latest().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_record_removes_its_assignments() {
        let store = MemoryStore::new();
        let crew = store
            .create_application(application("Anna Cruz", "Chief Mate"))
            .await
            .unwrap();
        store
            .assign_vessel(posting(&crew.id, "MV Coral Sea"))
            .await
            .unwrap();

        store.delete_record(&crew.id).await.unwrap();

        let mut crew_snapshots = store.watch_crew();
        let mut assignment_snapshots = store.watch_assignments();
        assert!(crew_snapshots.latest().is_empty());
        assert!(assignment_snapshots.latest().is_empty());

        let missing = store.get_record(&crew.id).await;
        assert!(matches!(missing, Err(CrewdeskError::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn unknown_ids_are_reported_not_fabricated() {
        let store = MemoryStore::new();
        let ghost = RecordId::try_from("no-such-record").unwrap();

        assert!(matches!(
            store.get_record(&ghost).await,
            Err(CrewdeskError::RecordNotFound(_))
        ));
        assert!(matches!(
            store.set_status(&ghost, CrewStatus::Passed).await,
            Err(CrewdeskError::RecordNotFound(_))
        ));
        assert!(matches!(
            store.assign_vessel(posting(&ghost, "MV Coral Sea")).await,
            Err(CrewdeskError::RecordNotFound(_))
        ));
    }
}
