//! Navigation URL construction for neighbouring pages.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Path and raw query string of the request being paginated.
///
/// Navigation links keep every query pair except `page` exactly as the client
/// sent it, in the original order, and append the new `page` value last.
///
/// # Examples
/// ```
/// use pagination::RequestLocation;
///
/// let location = RequestLocation::new("/api/v1/users", Some("page=2&keyword=ann%20lee"));
/// assert_eq!(location.with_page(3), "/api/v1/users?keyword=ann%20lee&page=3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLocation {
    path: String,
    query: String,
}

impl RequestLocation {
    /// Capture the request path and its raw (still encoded) query string.
    pub fn new(path: impl Into<String>, query: Option<&str>) -> Self {
        Self {
            path: path.into(),
            query: query.unwrap_or_default().to_owned(),
        }
    }

    /// Request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// URL of the same request pointing at `page`.
    #[must_use]
    pub fn with_page(&self, page: u64) -> String {
        let mut pairs: Vec<&str> = self
            .query
            .split('&')
            .filter(|segment| !segment.is_empty() && !is_page_pair(segment))
            .collect();
        let page_pair = format!("page={page}");
        pairs.push(page_pair.as_str());
        format!("{}?{}", self.path, pairs.join("&"))
    }
}

fn is_page_pair(segment: &str) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == "page")
}
