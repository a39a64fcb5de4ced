//! Fixed-size pagination.

/// One window over an ordered result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<'a, T> {
    /// Records visible on this page, in result order.
    pub items: &'a [T],
    /// The page actually served, after clamping.
    pub page: usize,
    /// Always at least 1, even over an empty set.
    pub total_pages: usize,
    /// Size of the whole result set, not of this page.
    pub total_records: usize,
}

/// Slice the page numbered `page` (1-based) out of `records`.
///
/// A page number beyond the last page serves the last page rather than
/// failing; zero serves the first. A zero `page_size` is read as 1.
pub fn paginate<T>(records: &[T], page_size: usize, page: usize) -> Paged<'_, T> {
    let size = page_size.max(1);
    let total_records = records.len();
    let total_pages = total_records.div_ceil(size).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * size).min(total_records);
    let end = (start + size).min(total_records);
    Paged {
        items: &records[start..end],
        page,
        total_pages,
        total_records,
    }
}
