//! Shared persistence error and listing types for repository ports.
use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by repository adapters.
    pub enum PersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "repository query failed: {message}",
        /// A uniqueness constraint rejected the write.
        Conflict { message: String } => "repository constraint violated: {message}",
    }
}

/// One slice of a filtered listing plus the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSlice<T> {
    /// Rows in the requested slice.
    pub items: Vec<T>,
    /// Rows matching the filter across all slices.
    pub total: u64,
}
