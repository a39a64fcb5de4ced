//! Derived presentation fields.
//!
//! Everything here is computed from stored fields at read time and never
//! persisted: the answers change as the clock advances, so caching one
//! would serve stale state. Each function takes the reference instant
//! explicitly, which keeps callers and tests in agreement about "now".

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SeaServiceEntry;

/// Documents within this many days of expiry count as `Expiring`.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Crew with fewer days onboard than this are flagged for attention.
pub const ATTENTION_THRESHOLD_DAYS: i64 = 70;

/// Whole years between `date_of_birth` and `today`.
///
/// `None` when the birth date is missing or lies in the future; callers
/// render the "unknown" placeholder for it.
pub fn age(date_of_birth: Option<NaiveDate>, today: NaiveDate) -> Option<u32> {
    let born = date_of_birth?;
    let mut years = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Floor of whole days from `signed_on` to `today`.
///
/// `None` without a sign-on date. A future sign-on yields a negative
/// count, which reads the same as freshly joined.
pub fn days_onboard(signed_on: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    signed_on.map(|joined| (today - joined).num_days())
}

/// Whether a days-onboard figure is below [`ATTENTION_THRESHOLD_DAYS`].
///
/// Crew without a sign-on date are never flagged.
pub fn needs_attention(days_onboard: Option<i64>) -> bool {
    matches!(days_onboard, Some(days) if days < ATTENTION_THRESHOLD_DAYS)
}

/// The sea-service entry with the greatest `signed_on` date.
///
/// The stored list is unordered. Ties keep the earliest-stored entry, and
/// entries without a sign-on date rank below any dated entry. `None` only
/// for an empty list.
pub fn latest_sea_service(entries: &[SeaServiceEntry]) -> Option<&SeaServiceEntry> {
    let mut latest: Option<&SeaServiceEntry> = None;
    for entry in entries {
        if latest.map_or(true, |best| entry.signed_on > best.signed_on) {
            latest = Some(entry);
        }
    }
    latest
}

/// Expiry classification of a single document at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentStatus {
    Valid,
    Expiring,
    Expired,
    /// No expiry date on file. Kept apart from `Valid` so an undated
    /// document cannot read as perpetually in force.
    Missing,
}

/// Days from `now` until the expiry date's midnight, partial days rounded
/// up. Equal to the civil-date difference; negative once the date has
/// passed.
pub fn days_until(expiry: NaiveDate, now: DateTime<Utc>) -> i64 {
    (expiry - now.date_naive()).num_days()
}

/// Classify a document by its expiry date at `now`.
///
/// `Expired` below day zero, `Expiring` within [`EXPIRY_WARNING_DAYS`]
/// (inclusive, counting day zero), `Valid` beyond, `Missing` without a
/// date.
pub fn document_status(expiry_date: Option<NaiveDate>, now: DateTime<Utc>) -> DocumentStatus {
    match expiry_date {
        None => DocumentStatus::Missing,
        Some(expiry) => {
            let days = days_until(expiry, now);
            if days < 0 {
                DocumentStatus::Expired
            } else if days <= EXPIRY_WARNING_DAYS {
                DocumentStatus::Expiring
            } else {
                DocumentStatus::Valid
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn entry(vessel_name: &str, signed_on: Option<NaiveDate>) -> SeaServiceEntry {
        SeaServiceEntry {
            vessel_name: vessel_name.to_string(),
            vessel_type: "Bulk Carrier".to_string(),
            principal: "Aurora Shipping".to_string(),
            signed_on,
            signed_off: None,
        }
    }

    #[test]
    fn age_counts_whole_years() {
        let today = date(2024, 3, 14);
        assert_eq!(age(Some(date(1988, 3, 14)), today), Some(36));
        assert_eq!(age(Some(date(1988, 3, 15)), today), Some(35));
        assert_eq!(age(Some(date(1988, 12, 1)), today), Some(35));
        assert_eq!(age(None, today), None);
    }

    #[test]
    fn age_of_future_birth_date_is_unknown() {
        assert_eq!(age(Some(date(2030, 1, 1)), date(2024, 1, 1)), None);
    }

    #[test]
    fn days_onboard_floors_whole_days() {
        let today = date(2024, 3, 1);
        assert_eq!(days_onboard(Some(date(2024, 1, 1)), today), Some(60));
        assert_eq!(days_onboard(Some(today), today), Some(0));
        assert_eq!(days_onboard(None, today), None);
    }

    #[test]
    fn attention_flag_below_threshold() {
        assert!(needs_attention(Some(0)));
        assert!(needs_attention(Some(69)));
        assert!(!needs_attention(Some(70)));
        assert!(!needs_attention(Some(180)));
        assert!(!needs_attention(None));
    }

    #[test]
    fn latest_entry_wins_regardless_of_storage_order() {
        let entries = vec![
            entry("MV Alpha", Some(date(2022, 1, 1))),
            entry("MV Beta", Some(date(2023, 6, 1))),
        ];
        assert_eq!(
            latest_sea_service(&entries).map(|e| e.vessel_name.as_str()),
            Some("MV Beta")
        );
    }

    #[test]
    fn latest_entry_tie_keeps_storage_order() {
        let entries = vec![
            entry("MV First", Some(date(2023, 6, 1))),
            entry("MV Second", Some(date(2023, 6, 1))),
        ];
        assert_eq!(
            latest_sea_service(&entries).map(|e| e.vessel_name.as_str()),
            Some("MV First")
        );
    }

    #[test]
    fn latest_entry_prefers_dated_over_undated() {
        let entries = vec![
            entry("MV Undated", None),
            entry("MV Dated", Some(date(2020, 1, 1))),
        ];
        assert_eq!(
            latest_sea_service(&entries).map(|e| e.vessel_name.as_str()),
            Some("MV Dated")
        );
        assert!(latest_sea_service(&[]).is_none());

        let undated_only = vec![entry("MV Lone", None)];
        assert_eq!(
            latest_sea_service(&undated_only).map(|e| e.vessel_name.as_str()),
            Some("MV Lone")
        );
    }

    #[test]
    fn document_status_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(
            document_status(Some(date(2023, 12, 31)), now),
            DocumentStatus::Expired
        );
        assert_eq!(days_until(date(2024, 1, 20), now), 19);
        assert_eq!(
            document_status(Some(date(2024, 1, 20)), now),
            DocumentStatus::Expiring
        );
        assert_eq!(
            document_status(Some(date(2024, 2, 15)), now),
            DocumentStatus::Valid
        );
        assert_eq!(document_status(None, now), DocumentStatus::Missing);
    }

    #[test]
    fn document_status_edges_around_warning_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        // Day zero still counts as expiring, day 30 is the last warning day.
        assert_eq!(
            document_status(Some(date(2024, 1, 1)), now),
            DocumentStatus::Expiring
        );
        assert_eq!(
            document_status(Some(date(2024, 1, 31)), now),
            DocumentStatus::Expiring
        );
        assert_eq!(
            document_status(Some(date(2024, 2, 1)), now),
            DocumentStatus::Valid
        );
    }

    #[test]
    fn days_until_rounds_partial_days_up() {
        let late_evening = Utc.with_ymd_and_hms(2024, 1, 1, 22, 45, 0).unwrap();
        assert_eq!(days_until(date(2024, 1, 20), late_evening), 19);
        assert_eq!(days_until(date(2023, 12, 31), late_evening), -1);
    }
}
