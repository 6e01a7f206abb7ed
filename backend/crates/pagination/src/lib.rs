//! Page-number pagination primitives shared by Stockdesk list endpoints.
//!
//! A list endpoint receives a [`PageRequest`] parsed from the query string,
//! fetches one page of rows plus the total row count, and hands both to
//! [`paginate`]. The resulting [`PaginationWindow`] carries the page metadata
//! and navigation URLs that clients use to walk the collection:
//!
//! ```
//! use pagination::{PageRequest, RequestLocation, paginate};
//!
//! let request = PageRequest::from_query("keyword=acme&page=1&page_size=10")
//!     .expect("valid page request");
//! let location = RequestLocation::new("/api/v1/stocks", Some("keyword=acme&page=1&page_size=10"));
//! let rows: Vec<u32> = (0..10).collect();
//!
//! let window = paginate(rows, 25, request, &location);
//! assert_eq!(window.last_page, 3);
//! assert_eq!(
//!     window.next_page_url.as_deref(),
//!     Some("/api/v1/stocks?keyword=acme&page_size=10&page=2"),
//! );
//! assert!(window.prev_page_url.is_none());
//! ```

mod links;
mod request;
mod window;

pub use links::RequestLocation;
pub use request::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest, PageRequestError};
pub use window::{PageLinks, PaginationWindow, last_page, paginate};
