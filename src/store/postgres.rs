//! Postgres store backend.
//!
//! Records live as JSONB documents keyed by id. Statement triggers send
//! a `NOTIFY` on every committed change, a background listener reloads
//! the affected collection and republishes it, so external writers are
//! observed the same way as local ones. Local writes also republish
//! directly, which keeps reads of one's own writes immediate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::errors::CrewdeskError;
use crate::models::{
    CrewRecord, CrewStatus, NewApplication, NewAssignment, RecordId, VesselAssignment,
};
use crate::store::{CrewStore, Snapshots};

/// Channel the change triggers notify on; payload names the table.
const CHANGE_CHANNEL: &str = "crewdesk_changes";

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

struct Shared {
    pool: PgPool,
    crew_tx: watch::Sender<Arc<Vec<CrewRecord>>>,
    assignment_tx: watch::Sender<Arc<Vec<VesselAssignment>>>,
}

impl Shared {
    async fn publish_crew(&self) -> Result<(), CrewdeskError> {
        let records =
            fetch_collection(&self.pool, "SELECT record FROM crew_records ORDER BY id").await?;
        self.crew_tx.send_replace(Arc::new(records));
        Ok(())
    }

    async fn publish_assignments(&self) -> Result<(), CrewdeskError> {
        let assignments = fetch_collection(
            &self.pool,
            "SELECT record FROM vessel_assignments ORDER BY id",
        )
        .await?;
        self.assignment_tx.send_replace(Arc::new(assignments));
        Ok(())
    }

    async fn publish_all(&self) -> Result<(), CrewdeskError> {
        self.publish_crew().await?;
        self.publish_assignments().await
    }
}

async fn fetch_collection<T: DeserializeOwned>(
    pool: &PgPool,
    query: &str,
) -> Result<Vec<T>, CrewdeskError> {
    let rows: Vec<(serde_json::Value,)> = sqlx::query_as(query).fetch_all(pool).await?;
    rows.into_iter()
        .map(|(value,)| serde_json::from_value(value).map_err(CrewdeskError::from))
        .collect()
}

/// Record store backed by Postgres.
pub struct PgStore {
    shared: Arc<Shared>,
    listener: JoinHandle<()>,
}

impl PgStore {
    /// Connect, apply migrations and start watching for changes.
    pub async fn connect(config: &StoreConfig) -> Result<Self, CrewdeskError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Self::with_pool(pool, config.reconnect_delay).await
    }

    /// Build a store over an existing pool. Used by tests that manage
    /// their own database.
    pub async fn with_pool(
        pool: PgPool,
        reconnect_delay: Duration,
    ) -> Result<Self, CrewdeskError> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        let crew = fetch_collection(&pool, "SELECT record FROM crew_records ORDER BY id").await?;
        let assignments = fetch_collection(
            &pool,
            "SELECT record FROM vessel_assignments ORDER BY id",
        )
        .await?;
        info!(
            "Connected to record store: {} crew records, {} assignments",
            crew.len(),
            assignments.len()
        );

        let (crew_tx, _) = watch::channel(Arc::new(crew));
        let (assignment_tx, _) = watch::channel(Arc::new(assignments));
        let shared = Arc::new(Shared {
            pool,
            crew_tx,
            assignment_tx,
        });
        let listener = tokio::spawn(run_listener(Arc::clone(&shared), reconnect_delay));
        Ok(Self { shared, listener })
    }

    /// Stop the change listener and drain the pool.
    pub async fn close(&self) {
        self.listener.abort();
        self.shared.pool.close().await;
    }
}

impl Drop for PgStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Keep a `LISTEN` subscription alive, republishing collections as the
/// triggers report changes.
///
/// Connection loss backs off from `reconnect_delay`, doubling up to
/// [`MAX_RECONNECT_DELAY`]. Each successful (re)subscribe republishes
/// both collections, since notifications sent while disconnected are
/// gone for good.
async fn run_listener(shared: Arc<Shared>, reconnect_delay: Duration) {
    let mut delay = reconnect_delay;
    loop {
        match subscribe(&shared.pool).await {
            Ok(mut listener) => {
                info!("Listening for record changes");
                delay = reconnect_delay;
                if let Err(e) = shared.publish_all().await {
                    warn!("Snapshot refresh failed: {}", e);
                }
                loop {
                    match listener.try_recv().await {
                        Ok(Some(notification)) => {
                            let refreshed = match notification.payload() {
                                "crew_records" => shared.publish_crew().await,
                                "vessel_assignments" => shared.publish_assignments().await,
                                other => {
                                    debug!("Ignoring notification for {}", other);
                                    Ok(())
                                }
                            };
                            if let Err(e) = refreshed {
                                warn!("Snapshot refresh failed: {}", e);
                            }
                        }
                        Ok(None) => {
                            // The driver reconnected under us; refresh to
                            // cover whatever the gap swallowed.
                            warn!("Change listener reconnected, refreshing snapshots");
                            if let Err(e) = shared.publish_all().await {
                                warn!("Snapshot refresh failed: {}", e);
                            }
                        }
                        Err(e) => {
                            warn!("Change listener lost its connection: {}", e);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Change listener could not subscribe: {}", e);
            }
        }
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_RECONNECT_DELAY);
    }
}

async fn subscribe(pool: &PgPool) -> Result<PgListener, sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANGE_CHANNEL).await?;
    Ok(listener)
}

#[async_trait]
impl CrewStore for PgStore {
    fn watch_crew(&self) -> Snapshots<CrewRecord> {
        Snapshots::new(self.shared.crew_tx.subscribe())
    }

    fn watch_assignments(&self) -> Snapshots<VesselAssignment> {
        Snapshots::new(self.shared.assignment_tx.subscribe())
    }

    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<CrewRecord, CrewdeskError> {
        let record = application.into_record(RecordId::generate(), Utc::now());
        sqlx::query("INSERT INTO crew_records (id, record) VALUES ($1, $2)")
            .bind(record.id.as_str())
            .bind(serde_json::to_value(&record)?)
            .execute(&self.shared.pool)
            .await?;
        self.shared.publish_crew().await?;
        Ok(record)
    }

    async fn get_record(&self, id: &RecordId) -> Result<CrewRecord, CrewdeskError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT record FROM crew_records WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.shared.pool)
                .await?;
        match row {
            Some((value,)) => Ok(serde_json::from_value(value)?),
            None => Err(CrewdeskError::RecordNotFound(id.to_string())),
        }
    }

    async fn update_record(&self, record: CrewRecord) -> Result<(), CrewdeskError> {
        let result = sqlx::query(
            "UPDATE crew_records SET record = $2, updated_at = now() WHERE id = $1",
        )
        .bind(record.id.as_str())
        .bind(serde_json::to_value(&record)?)
        .execute(&self.shared.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CrewdeskError::RecordNotFound(record.id.to_string()));
        }
        self.shared.publish_crew().await
    }

    async fn set_status(&self, id: &RecordId, status: CrewStatus) -> Result<(), CrewdeskError> {
        let result = sqlx::query(
            "UPDATE crew_records \
             SET record = jsonb_set(record, '{status}', to_jsonb($2::text)), \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(status.label())
        .execute(&self.shared.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CrewdeskError::RecordNotFound(id.to_string()));
        }
        self.shared.publish_crew().await
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), CrewdeskError> {
        let result = sqlx::query("DELETE FROM crew_records WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.shared.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CrewdeskError::RecordNotFound(id.to_string()));
        }
        // Assignments cascade with the record.
        self.shared.publish_all().await
    }

    async fn assign_vessel(
        &self,
        assignment: NewAssignment,
    ) -> Result<VesselAssignment, CrewdeskError> {
        let mut tx = self.shared.pool.begin().await?;
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT record FROM crew_records WHERE id = $1 FOR UPDATE")
                .bind(assignment.crew_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let value = row
            .ok_or_else(|| CrewdeskError::RecordNotFound(assignment.crew_id.to_string()))?
            .0;
        let mut crew: CrewRecord = serde_json::from_value(value)?;
        crew.open_sea_service(
            &assignment.vessel_name,
            &assignment.vessel_type,
            &assignment.principal,
            assignment.signed_on,
        );
        sqlx::query("UPDATE crew_records SET record = $2, updated_at = now() WHERE id = $1")
            .bind(crew.id.as_str())
            .bind(serde_json::to_value(&crew)?)
            .execute(&mut *tx)
            .await?;

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
        sqlx::query("INSERT INTO vessel_assignments (id, crew_id, record) VALUES ($1, $2, $3)")
            .bind(stored.id.as_str())
            .bind(stored.crew_id.as_str())
            .bind(serde_json::to_value(&stored)?)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.shared.publish_all().await?;
        Ok(stored)
    }

    async fn end_assignment(
        &self,
        assignment_id: &RecordId,
        signed_off: NaiveDate,
    ) -> Result<(), CrewdeskError> {
        let mut tx = self.shared.pool.begin().await?;
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT record FROM vessel_assignments WHERE id = $1 FOR UPDATE")
                .bind(assignment_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let value = row
            .ok_or_else(|| CrewdeskError::RecordNotFound(assignment_id.to_string()))?
            .0;
        let assignment: VesselAssignment = serde_json::from_value(value)?;
        sqlx::query("DELETE FROM vessel_assignments WHERE id = $1")
            .bind(assignment_id.as_str())
            .execute(&mut *tx)
            .await?;

        let crew_row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT record FROM crew_records WHERE id = $1 FOR UPDATE")
                .bind(assignment.crew_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if let Some((value,)) = crew_row {
            let mut crew: CrewRecord = serde_json::from_value(value)?;
            crew.close_sea_service(&assignment.vessel_name, assignment.signed_on, signed_off);
            sqlx::query("UPDATE crew_records SET record = $2, updated_at = now() WHERE id = $1")
                .bind(crew.id.as_str())
                .bind(serde_json::to_value(&crew)?)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.shared.publish_all().await
    }
}
