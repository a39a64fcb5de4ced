//! Summary counts over the filtered set.
//!
//! Aggregates always read the whole filtered set, never a page slice, so
//! summary cards and charts reflect the active filters regardless of
//! which page is on screen. Bucket edges are derived from the instant
//! passed in; nothing here caches across calls.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::derive::{self, DocumentStatus};
use crate::models::{CrewRecord, CrewStatus};

/// Record count for one status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTotal {
    pub status: CrewStatus,
    pub count: usize,
}

/// Record count within one day or month interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateBucket {
    /// First day the bucket covers.
    pub starts_on: NaiveDate,
    /// Axis label, preformatted for chart rendering.
    pub label: String,
    pub count: usize,
}

/// Document counts by expiry classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpirySummary {
    pub valid: usize,
    pub expiring: usize,
    pub expired: usize,
    pub missing: usize,
}

/// Count records per status, one entry per known status.
///
/// Statuses with no members are reported with a zero count so summary
/// rows never drop out of the display when a filter empties them.
pub fn status_totals(records: &[&CrewRecord]) -> Vec<StatusTotal> {
    let mut totals: Vec<StatusTotal> = CrewStatus::ALL
        .iter()
        .map(|&status| StatusTotal { status, count: 0 })
        .collect();
    for record in records {
        if let Some(total) = totals.iter_mut().find(|total| total.status == record.status) {
            total.count += 1;
        }
    }
    totals
}

/// Applications per day over the trailing `days` days, oldest bucket
/// first and today last.
///
/// Records without a usable application instant are left out; they have
/// no day to land in.
pub fn daily_histogram(records: &[&CrewRecord], days: u32, now: DateTime<Utc>) -> Vec<DateBucket> {
    let today = now.date_naive();
    let mut buckets: Vec<DateBucket> = (0..days)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(i64::from(offset));
            DateBucket {
                starts_on: day,
                label: day.format("%b %d").to_string(),
                count: 0,
            }
        })
        .collect();
    for record in records {
        if let Some(applied) = record.applied_at {
            let day = applied.date_naive();
            if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.starts_on == day) {
                bucket.count += 1;
            }
        }
    }
    buckets
}

/// Applications per calendar month over the trailing `months` months,
/// the current month last.
pub fn monthly_histogram(
    records: &[&CrewRecord],
    months: u32,
    now: DateTime<Utc>,
) -> Vec<DateBucket> {
    let today = now.date_naive();
    let current = today.with_day(1).unwrap_or(today);
    let mut buckets: Vec<DateBucket> = (0..months)
        .rev()
        .filter_map(|offset| current.checked_sub_months(Months::new(offset)))
        .map(|month| DateBucket {
            starts_on: month,
            label: month.format("%b %Y").to_string(),
            count: 0,
        })
        .collect();
    for record in records {
        if let Some(applied) = record.applied_at {
            if let Some(month) = applied.date_naive().with_day(1) {
                if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.starts_on == month) {
                    bucket.count += 1;
                }
            }
        }
    }
    buckets
}

/// Classify every document across `records` by expiry state at `now`.
pub fn expiry_summary(records: &[&CrewRecord], now: DateTime<Utc>) -> ExpirySummary {
    let mut summary = ExpirySummary::default();
    for record in records {
        for document in &record.documents {
            match derive::document_status(document.expiry_date, now) {
                DocumentStatus::Valid => summary.valid += 1,
                DocumentStatus::Expiring => summary.expiring += 1,
                DocumentStatus::Expired => summary.expired += 1,
                DocumentStatus::Missing => summary.missing += 1,
            }
        }
    }
    summary
}
