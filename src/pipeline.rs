//! List presentation pipeline.
//!
//! Every list surface renders the latest snapshot through the same four
//! stages: filter the record set, sort it, slice out one page, and
//! summarize the whole filtered set. No stage mutates its input; each
//! produces a fresh sequence, so rerunning a stage over the same input
//! gives an identical result.

pub mod aggregate;
pub mod filter;
pub mod page;
pub mod sort;

pub use aggregate::{DateBucket, ExpirySummary, StatusTotal};
pub use filter::{filter_records, FilterCriteria};
pub use page::{paginate, Paged};
pub use sort::{sorted, SortDirection, SortKey};
