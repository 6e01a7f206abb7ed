//! Page windows returned by list endpoints.

use serde::{Deserialize, Serialize};

use crate::{PageRequest, RequestLocation};

/// Number of pages needed to show `total` rows, or zero when `page_size` is
/// zero.
///
/// # Examples
/// ```
/// assert_eq!(pagination::last_page(25, 10), 3);
/// assert_eq!(pagination::last_page(0, 10), 0);
/// assert_eq!(pagination::last_page(25, 0), 0);
/// ```
#[must_use]
pub const fn last_page(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// Whether neighbouring pages exist around the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLinks {
    /// More rows follow the current page.
    pub has_next: bool,
    /// Rows precede the current page.
    pub has_previous: bool,
}

impl PageLinks {
    /// Derive navigation flags from the page position and row counts.
    ///
    /// A next page exists when rows were returned and the rows before and on
    /// this page do not account for the total. A previous page exists when
    /// this is not the first page and the total reaches the start of it.
    #[must_use]
    pub const fn compute(current_page: u64, page_size: u64, returned: u64, total: u64) -> Self {
        let skipped = page_size.saturating_mul(current_page.saturating_sub(1));
        Self {
            has_next: total > 0 && returned > 0 && total > skipped.saturating_add(returned),
            has_previous: current_page > 1 && total >= skipped,
        }
    }
}

/// One page of rows plus the metadata clients need to navigate.
///
/// `current_page` never exceeds `last_page`, so an out-of-range request
/// reports the last real page (or zero for an empty collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationWindow<T> {
    /// Requested page size.
    pub page_size: u64,
    /// Requested page clamped to `last_page`.
    pub current_page: u64,
    /// Number of the final page.
    pub last_page: u64,
    /// Total rows across all pages.
    pub total: u64,
    /// Link to the following page, when one exists.
    pub next_page_url: Option<String>,
    /// Link to the preceding page, when one exists.
    pub prev_page_url: Option<String>,
    /// Rows on this page.
    pub data: Vec<T>,
}

impl<T> PaginationWindow<T> {
    /// More rows follow this page.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next_page_url.is_some()
    }

    /// Rows precede this page.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.prev_page_url.is_some()
    }

    /// Convert every row while keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> PaginationWindow<U>
    where
        F: FnMut(T) -> U,
    {
        PaginationWindow {
            page_size: self.page_size,
            current_page: self.current_page,
            last_page: self.last_page,
            total: self.total,
            next_page_url: self.next_page_url,
            prev_page_url: self.prev_page_url,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

/// Build the window for one fetched page of rows.
///
/// `total` is the row count of the whole filtered collection; `data` holds
/// only the rows of the requested page.
pub fn paginate<T>(
    data: Vec<T>,
    total: u64,
    request: PageRequest,
    location: &RequestLocation,
) -> PaginationWindow<T> {
    let current = request.page();
    let size = request.page_size();
    let last = last_page(total, size);
    let returned = u64::try_from(data.len()).unwrap_or(u64::MAX);
    let links = PageLinks::compute(current, size, returned, total);

    PaginationWindow {
        page_size: size,
        current_page: current.min(last),
        last_page: last,
        total,
        next_page_url: links
            .has_next
            .then(|| location.with_page(current.saturating_add(1))),
        prev_page_url: links
            .has_previous
            .then(|| location.with_page(current.saturating_sub(1))),
        data,
    }
}
