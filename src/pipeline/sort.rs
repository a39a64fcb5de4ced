//! Result ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::CrewRecord;

/// Field a list can be ordered by.
///
/// Names and ranks compare case-insensitively, application instants
/// numerically with missing instants at the oldest end, and statuses by
/// their wire label. The default pairing with [`SortDirection`] yields
/// newest-application-first, which is what every list opens with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Name,
    #[default]
    AppliedAt,
    Rank,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortKey {
    fn compare(self, a: &CrewRecord, b: &CrewRecord) -> Ordering {
        match self {
            SortKey::Name => compare_text(&a.full_name, &b.full_name),
            SortKey::AppliedAt => a.applied_at.cmp(&b.applied_at),
            SortKey::Rank => compare_text(&a.rank, &b.rank),
            SortKey::Status => a.status.label().cmp(b.status.label()),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Order `records` by `key`, ties keeping their filtered order.
///
/// The input is left untouched; the returned sequence is a fresh
/// arrangement of the same borrowed records.
pub fn sorted<'a>(
    records: &[&'a CrewRecord],
    key: SortKey,
    direction: SortDirection,
) -> Vec<&'a CrewRecord> {
    let mut ordered = records.to_vec();
    ordered.sort_by(|a, b| {
        let ordering = key.compare(a, b);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    ordered
}
