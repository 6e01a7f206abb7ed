//! Page selection parsed from list query strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::form_urlencoded;

/// Page size applied when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Largest page size a client may request; larger values are clamped.
pub const MAX_PAGE_SIZE: u64 = 1000;

const PAGE_PARAM: &str = "page";
const PAGE_SIZE_PARAM: &str = "page_size";

/// Errors raised while building a [`PageRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// Pages are numbered from one.
    #[error("page must be at least 1")]
    ZeroPage,
    /// A page must hold at least one row.
    #[error("page size must be at least 1")]
    ZeroPageSize,
    /// A query parameter did not hold an unsigned integer.
    #[error("`{param}` must be a positive integer, got `{value}`")]
    NotANumber {
        /// Query parameter name.
        param: &'static str,
        /// Raw value received.
        value: String,
    },
}

/// One-based page number and page size requested by a client.
///
/// ## Invariants
/// - `page >= 1`.
/// - `1 <= page_size <= MAX_PAGE_SIZE`.
///
/// # Examples
/// ```
/// use pagination::PageRequest;
///
/// let request = PageRequest::new(3, 20).expect("valid request");
/// assert_eq!(request.offset(), 40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build a request, clamping oversized pages to [`MAX_PAGE_SIZE`].
    ///
    /// # Errors
    /// Returns [`PageRequestError::ZeroPage`] or
    /// [`PageRequestError::ZeroPageSize`] for zero inputs.
    pub fn new(page: u64, page_size: u64) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::ZeroPage);
        }
        if page_size == 0 {
            return Err(PageRequestError::ZeroPageSize);
        }
        Ok(Self {
            page,
            page_size: page_size.min(MAX_PAGE_SIZE),
        })
    }

    /// Parse `page` and `page_size` from a raw query string.
    ///
    /// Missing or empty parameters take their defaults (page 1, page size
    /// [`DEFAULT_PAGE_SIZE`]). Other parameters are ignored.
    ///
    /// # Errors
    /// Returns [`PageRequestError::NotANumber`] when either parameter is not
    /// an unsigned integer, or the errors of [`PageRequest::new`].
    ///
    /// # Examples
    /// ```
    /// use pagination::PageRequest;
    ///
    /// let request = PageRequest::from_query("keyword=acme&page_size=5000")
    ///     .expect("valid request");
    /// assert_eq!(request.page(), 1);
    /// assert_eq!(request.page_size(), pagination::MAX_PAGE_SIZE);
    /// ```
    pub fn from_query(query: &str) -> Result<Self, PageRequestError> {
        let mut page = None;
        let mut page_size = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                PAGE_PARAM => page = Some(value.into_owned()),
                PAGE_SIZE_PARAM => page_size = Some(value.into_owned()),
                _ => {}
            }
        }
        let page = parse_param(PAGE_PARAM, page.as_deref())?.unwrap_or(1);
        let page_size =
            parse_param(PAGE_SIZE_PARAM, page_size.as_deref())?.unwrap_or(DEFAULT_PAGE_SIZE);
        Self::new(page, page_size)
    }

    /// Parse like [`PageRequest::from_query`], replacing each unusable value
    /// with its default instead of failing.
    ///
    /// The problems found are returned so callers can log them.
    ///
    /// # Examples
    /// ```
    /// use pagination::{DEFAULT_PAGE_SIZE, PageRequest};
    ///
    /// let (request, problems) = PageRequest::from_query_lenient("page=abc&page_size=20");
    /// assert_eq!((request.page(), request.page_size()), (1, 20));
    /// assert_eq!(problems.len(), 1);
    ///
    /// let (request, _) = PageRequest::from_query_lenient("page=3&page_size=0");
    /// assert_eq!((request.page(), request.page_size()), (3, DEFAULT_PAGE_SIZE));
    /// ```
    #[must_use]
    pub fn from_query_lenient(query: &str) -> (Self, Vec<PageRequestError>) {
        let mut problems = Vec::new();
        let mut page = 1;
        let mut page_size = DEFAULT_PAGE_SIZE;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let (param, slot, zero) = match key.as_ref() {
                PAGE_PARAM => (PAGE_PARAM, &mut page, PageRequestError::ZeroPage),
                PAGE_SIZE_PARAM => (
                    PAGE_SIZE_PARAM,
                    &mut page_size,
                    PageRequestError::ZeroPageSize,
                ),
                _ => continue,
            };
            match parse_param(param, Some(&value)) {
                Ok(Some(0)) => problems.push(zero),
                Ok(Some(parsed)) => *slot = parsed,
                Ok(None) => {}
                Err(error) => problems.push(error),
            }
        }
        let request = Self {
            page,
            page_size: page_size.min(MAX_PAGE_SIZE),
        };
        (request, problems)
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    /// Maximum number of rows on the page.
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of rows preceding this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page_size.saturating_mul(self.page.saturating_sub(1))
    }
}

fn parse_param(param: &'static str, raw: Option<&str>) -> Result<Option<u64>, PageRequestError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| PageRequestError::NotANumber {
                param,
                value: value.to_owned(),
            }),
    }
}
