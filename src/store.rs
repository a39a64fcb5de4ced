//! Record storage.
//!
//! Backends deliver data as live snapshots: every committed change
//! republishes the complete collection, never a diff. Consumers rerun
//! their presentation pipeline over each snapshot and drop superseded
//! ones, so no merge or reconciliation logic exists anywhere.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::watch;

use crate::errors::CrewdeskError;
use crate::models::{
    CrewRecord, CrewStatus, NewApplication, NewAssignment, RecordId, VesselAssignment,
};

/// Live subscription to one collection.
///
/// [`latest`](Self::latest) hands back the snapshot current at the time
/// of the call; [`next`](Self::next) waits for a newer one. Rapid writes
/// may coalesce, so a reader observes the latest state rather than every
/// intermediate one. Dropping the subscription releases the watch.
#[derive(Debug)]
pub struct Snapshots<T> {
    receiver: watch::Receiver<Arc<Vec<T>>>,
}

impl<T> Snapshots<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<T>>>) -> Self {
        Self { receiver }
    }

    /// The most recently published snapshot.
    pub fn latest(&mut self) -> Arc<Vec<T>> {
        Arc::clone(&self.receiver.borrow_and_update())
    }

    /// Wait for a snapshot newer than the last one observed.
    ///
    /// `None` once the backing store has shut down.
    pub async fn next(&mut self) -> Option<Arc<Vec<T>>> {
        match self.receiver.changed().await {
            Ok(()) => Some(Arc::clone(&self.receiver.borrow_and_update())),
            Err(_) => None,
        }
    }
}

/// Capability set of a record store backend.
///
/// Writes return once the backend has accepted them; readers observe the
/// outcome through the next published snapshot rather than through local
/// state. An assignment and the matching sea-service entry on the crew
/// record are always written together, so the two views cannot drift.
#[async_trait]
pub trait CrewStore: Send + Sync {
    /// Subscribe to the crew record collection.
    fn watch_crew(&self) -> Snapshots<CrewRecord>;

    /// Subscribe to the vessel assignment collection.
    fn watch_assignments(&self) -> Snapshots<VesselAssignment>;

    /// File a new application. The stored record always starts pending,
    /// with identity assigned here.
    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<CrewRecord, CrewdeskError>;

    /// Fetch one record by id.
    async fn get_record(&self, id: &RecordId) -> Result<CrewRecord, CrewdeskError>;

    /// Replace a record's stored fields, keeping its identity.
    async fn update_record(&self, record: CrewRecord) -> Result<(), CrewdeskError>;

    /// Move a record to another status.
    async fn set_status(&self, id: &RecordId, status: CrewStatus) -> Result<(), CrewdeskError>;

    /// Remove a record and its assignments entirely. Removal is final;
    /// nothing remains to audit.
    async fn delete_record(&self, id: &RecordId) -> Result<(), CrewdeskError>;

    /// Put a crew member on a vessel: creates the assignment record and
    /// opens a sea-service entry on the crew record in one step.
    async fn assign_vessel(
        &self,
        assignment: NewAssignment,
    ) -> Result<VesselAssignment, CrewdeskError>;

    /// Take a crew member off a vessel: removes the assignment record
    /// and closes the matching sea-service entry in one step.
    async fn end_assignment(
        &self,
        assignment_id: &RecordId,
        signed_off: NaiveDate,
    ) -> Result<(), CrewdeskError>;
}
