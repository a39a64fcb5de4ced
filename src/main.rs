//! Crew roster service

use chrono::Utc;
use tokio::signal;
use tracing::info;

use crewdesk::config::AppConfig;
use crewdesk::errors::CrewdeskError;
use crewdesk::store::{CrewStore, PgStore};
use crewdesk::view::{assignment_overviews, ViewState};

#[tokio::main]
async fn main() -> Result<(), CrewdeskError> {
    // Initialize logging with more configuration
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration, preferring environment variables and config files
    let config = AppConfig::load()?;
    config.store.validate()?;
    config.view.validate()?;

    let store = PgStore::connect(&config.store).await?;

    // Setup signal handling for graceful shutdown
    let shutdown_signal = signal::ctrl_c();

    tokio::select! {
        result = run_roster(&store, &config) => {
            info!("Roster loop completed: {:?}", result);
        }
        _ = shutdown_signal => {
            info!("Received shutdown signal");
        }
    }

    store.close().await;

    Ok(())
}

/// Follow both collections and rerun the presentation pipeline on every
/// snapshot, logging the roster summary it produces.
async fn run_roster(store: &PgStore, config: &AppConfig) -> Result<(), CrewdeskError> {
    let mut crew = store.watch_crew();
    let mut assignments = store.watch_assignments();
    let view = ViewState::new(&config.view);

    let mut crew_snapshot = crew.latest();
    let mut assignment_snapshot = assignments.latest();

    loop {
        let now = Utc::now();
        let page = view.render(&crew_snapshot, now);
        let postings = assignment_overviews(&assignment_snapshot, now);
        let attention = postings
            .iter()
            .filter(|posting| posting.needs_attention)
            .count();
        info!(
            "Roster: {} records ({}), {} postings, {} need attention, {} documents expiring, {} expired",
            page.total_records,
            page.status_summary(),
            postings.len(),
            attention,
            page.expiry.expiring,
            page.expiry.expired
        );

        tokio::select! {
            snapshot = crew.next() => {
                match snapshot {
                    Some(snapshot) => crew_snapshot = snapshot,
                    None => break, // Store shut down
                }
            }
            snapshot = assignments.next() => {
                match snapshot {
                    Some(snapshot) => assignment_snapshot = snapshot,
                    None => break,
                }
            }
        }
    }

    Ok(())
}
