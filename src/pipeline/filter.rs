//! Record predicates.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::derive;
use crate::models::{CrewRecord, CrewStatus};

/// Independently toggleable predicates over a record set.
///
/// Each field filters one axis. A `None` or empty field leaves its axis
/// unfiltered, so the default value passes every record. All active
/// predicates must hold for a record to pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Exact status to keep. `None` is the "all statuses" sentinel.
    pub status: Option<CrewStatus>,
    /// Inclusive lower bound on the application instant.
    pub applied_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the application instant.
    pub applied_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring matched against name, email and phone.
    pub search: String,
    /// Ranks to keep. Empty keeps every rank.
    pub ranks: BTreeSet<String>,
    /// Principals to keep, matched against the latest sea-service entry.
    pub principals: BTreeSet<String>,
    /// Vessel types to keep, matched against the latest sea-service entry.
    pub vessel_types: BTreeSet<String>,
    /// Document names to keep; a record passes if it holds any of them.
    pub document_names: BTreeSet<String>,
}

impl FilterCriteria {
    /// Whether `record` satisfies every active predicate.
    pub fn matches(&self, record: &CrewRecord) -> bool {
        self.matches_status(record)
            && self.matches_applied_range(record)
            && self.matches_search(record)
            && self.matches_rank(record)
            && self.matches_voyage(record)
            && self.matches_documents(record)
    }

    fn matches_status(&self, record: &CrewRecord) -> bool {
        self.status.map_or(true, |status| record.status == status)
    }

    fn matches_applied_range(&self, record: &CrewRecord) -> bool {
        if self.applied_from.is_none() && self.applied_to.is_none() {
            return true;
        }
        // A record with no usable application instant cannot fall inside
        // a bounded range.
        match record.applied_at {
            Some(applied) => {
                self.applied_from.map_or(true, |from| applied >= from)
                    && self.applied_to.map_or(true, |to| applied <= to)
            }
            None => false,
        }
    }

    fn matches_search(&self, record: &CrewRecord) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let hit = |field: &str| field.to_lowercase().contains(&needle);
        hit(&record.full_name)
            || record.email.as_deref().map_or(false, hit)
            || record.phone.as_deref().map_or(false, hit)
    }

    fn matches_rank(&self, record: &CrewRecord) -> bool {
        self.ranks.is_empty() || self.ranks.contains(&record.rank)
    }

    fn matches_voyage(&self, record: &CrewRecord) -> bool {
        if self.principals.is_empty() && self.vessel_types.is_empty() {
            return true;
        }
        match derive::latest_sea_service(&record.sea_service) {
            Some(latest) => {
                (self.principals.is_empty() || self.principals.contains(&latest.principal))
                    && (self.vessel_types.is_empty()
                        || self.vessel_types.contains(&latest.vessel_type))
            }
            None => false,
        }
    }

    fn matches_documents(&self, record: &CrewRecord) -> bool {
        self.document_names.is_empty()
            || record
                .documents
                .iter()
                .any(|document| self.document_names.contains(&document.name))
    }
}

/// Keep the records satisfying `criteria`, in snapshot order.
pub fn filter_records<'a>(
    records: &'a [CrewRecord],
    criteria: &FilterCriteria,
) -> Vec<&'a CrewRecord> {
    records
        .iter()
        .filter(|record| criteria.matches(record))
        .collect()
}
