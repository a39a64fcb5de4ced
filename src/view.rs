//! List view rendering.
//!
//! A view owns its interactive state (criteria, ordering, page) and
//! projects any snapshot through the pipeline into the exact shape the
//! tables and summary cards consume. Rendering never mutates the
//! snapshot, so a superseded render is simply dropped when a newer
//! snapshot or state change arrives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::config::ViewConfig;
use crate::derive::{self, DocumentStatus};
use crate::models::{CrewRecord, CrewStatus, RecordId, VesselAssignment};
use crate::pipeline::aggregate::{self, DateBucket, ExpirySummary, StatusTotal};
use crate::pipeline::filter::{filter_records, FilterCriteria};
use crate::pipeline::page::paginate;
use crate::pipeline::sort::{sorted, SortDirection, SortKey};

/// Placeholder rendered where a derived value cannot be computed.
pub const PLACEHOLDER: &str = "—";

/// One rendered crew row: stored fields plus everything derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewOverview {
    pub id: RecordId,
    pub full_name: String,
    pub rank: String,
    pub status: CrewStatus,
    pub age: Option<u32>,
    pub applied_at: Option<DateTime<Utc>>,
    /// Current vessel, from the latest sea-service entry. The
    /// placeholder stands in when the record has no sea service.
    pub vessel_name: String,
    pub vessel_type: String,
    pub principal: String,
    /// Days aboard the current vessel; `None` once signed off or when
    /// no sign-on date is known.
    pub days_onboard: Option<i64>,
    pub needs_attention: bool,
    pub documents: Vec<DocumentOverview>,
}

/// One rendered document row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOverview {
    pub name: String,
    pub expiry_date: Option<NaiveDate>,
    pub days_left: Option<i64>,
    pub status: DocumentStatus,
}

/// One rendered assignment row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOverview {
    pub id: RecordId,
    pub crew_id: RecordId,
    pub crew_name: String,
    pub vessel_name: String,
    pub vessel_type: String,
    pub principal: String,
    pub signed_on: Option<NaiveDate>,
    pub days_onboard: Option<i64>,
    pub needs_attention: bool,
}

/// Everything one list render produces: the visible rows plus summaries
/// computed over the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub rows: Vec<CrewOverview>,
    pub page: usize,
    pub total_pages: usize,
    pub total_records: usize,
    pub status_totals: Vec<StatusTotal>,
    pub expiry: ExpirySummary,
    pub daily_trend: Vec<DateBucket>,
    pub monthly_trend: Vec<DateBucket>,
}

impl ListPage {
    /// The nonzero status totals on one line, for log output.
    pub fn status_summary(&self) -> String {
        let parts: Vec<String> = self
            .status_totals
            .iter()
            .filter(|total| total.count > 0)
            .map(|total| format!("{} {}", total.count, total.status.label()))
            .collect();
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Project a record into its rendered row at `now`.
pub fn annotate(record: &CrewRecord, now: DateTime<Utc>) -> CrewOverview {
    let today = now.date_naive();
    let latest = derive::latest_sea_service(&record.sea_service);
    let (vessel_name, vessel_type, principal) = match latest {
        Some(entry) => (
            entry.vessel_name.clone(),
            entry.vessel_type.clone(),
            entry.principal.clone(),
        ),
        None => (
            PLACEHOLDER.to_string(),
            PLACEHOLDER.to_string(),
            PLACEHOLDER.to_string(),
        ),
    };
    // Days aboard only count while the latest posting is still open.
    let days_onboard = match latest {
        Some(entry) if entry.signed_off.is_none() => {
            derive::days_onboard(entry.signed_on, today)
        }
        _ => None,
    };

    CrewOverview {
        id: record.id.clone(),
        full_name: record.full_name.clone(),
        rank: record.rank.clone(),
        status: record.status,
        age: derive::age(record.date_of_birth, today),
        applied_at: record.applied_at,
        vessel_name,
        vessel_type,
        principal,
        days_onboard,
        needs_attention: derive::needs_attention(days_onboard),
        documents: record
            .documents
            .iter()
            .map(|document| DocumentOverview {
                name: document.name.clone(),
                expiry_date: document.expiry_date,
                days_left: document
                    .expiry_date
                    .map(|expiry| derive::days_until(expiry, now)),
                status: derive::document_status(document.expiry_date, now),
            })
            .collect(),
    }
}

/// Project the assignment collection into rendered rows at `now`.
pub fn assignment_overviews(
    assignments: &[VesselAssignment],
    now: DateTime<Utc>,
) -> Vec<AssignmentOverview> {
    let today = now.date_naive();
    assignments
        .iter()
        .map(|assignment| {
            let days_onboard = if assignment.signed_off.is_none() {
                derive::days_onboard(assignment.signed_on, today)
            } else {
                None
            };
            AssignmentOverview {
                id: assignment.id.clone(),
                crew_id: assignment.crew_id.clone(),
                crew_name: assignment.crew_name.clone(),
                vessel_name: assignment.vessel_name.clone(),
                vessel_type: assignment.vessel_type.clone(),
                principal: assignment.principal.clone(),
                signed_on: assignment.signed_on,
                days_onboard,
                needs_attention: derive::needs_attention(days_onboard),
            }
        })
        .collect()
}

/// Interactive state of one list view.
///
/// Criteria and ordering changes return the view to page 1, so the next
/// render can never show a page that no longer exists under the new
/// result set.
#[derive(Debug, Clone)]
pub struct ViewState {
    criteria: FilterCriteria,
    sort_key: SortKey,
    direction: SortDirection,
    page: usize,
    page_size: usize,
    trend_days: u32,
    trend_months: u32,
}

impl ViewState {
    pub fn new(view: &ViewConfig) -> Self {
        Self {
            criteria: FilterCriteria::default(),
            sort_key: SortKey::default(),
            direction: SortDirection::default(),
            page: 1,
            page_size: view.page_size,
            trend_days: view.trend_days,
            trend_months: view.trend_months,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Replace the filter criteria. An actual change resets the page.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        if self.criteria != criteria {
            self.criteria = criteria;
            self.page = 1;
        }
    }

    /// Change the ordering. An actual change resets the page.
    pub fn set_order(&mut self, key: SortKey, direction: SortDirection) {
        if (self.sort_key, self.direction) != (key, direction) {
            self.sort_key = key;
            self.direction = direction;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Run the whole pipeline over a snapshot and assemble the page.
    ///
    /// Summaries are computed before pagination, so they reflect the
    /// filters but never the page selection.
    pub fn render(&self, records: &[CrewRecord], now: DateTime<Utc>) -> ListPage {
        let filtered = filter_records(records, &self.criteria);
        let status_totals = aggregate::status_totals(&filtered);
        let expiry = aggregate::expiry_summary(&filtered, now);
        let daily_trend = aggregate::daily_histogram(&filtered, self.trend_days, now);
        let monthly_trend = aggregate::monthly_histogram(&filtered, self.trend_months, now);

        let ordered = sorted(&filtered, self.sort_key, self.direction);
        let paged = paginate(&ordered, self.page_size, self.page);
        ListPage {
            rows: paged
                .items
                .iter()
                .map(|record| annotate(record, now))
                .collect(),
            page: paged.page,
            total_pages: paged.total_pages,
            total_records: paged.total_records,
            status_totals,
            expiry,
            daily_trend,
            monthly_trend,
        }
    }
}
