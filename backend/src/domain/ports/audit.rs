//! Ports for the audit side channel: a non-blocking dispatcher and the store
//! its worker writes to.
use async_trait::async_trait;

use crate::domain::{AuditCompletion, AuditJob, AuditRequest};

use super::{PersistenceError, define_port_error};

define_port_error! {
    /// Errors surfaced by the audit dispatcher.
    pub enum JobDispatchError {
        /// Queue infrastructure is unavailable.
        Unavailable { message: String } => "audit queue is unavailable: {message}",
        /// The job could not be accepted.
        Rejected { message: String } => "audit job was rejected: {message}",
    }
}

/// Fire-and-forget hand-off of audit jobs.
///
/// Delivery is at most once and unordered relative to the HTTP response.
/// `dispatch` must not block the caller.
#[cfg_attr(test, mockall::automock)]
pub trait AuditDispatcher: Send + Sync {
    /// Hand `job` to the background writer.
    fn dispatch(&self, job: AuditJob) -> Result<(), JobDispatchError>;
}

/// Durable storage of audit records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Create the pending record for a request.
    async fn record(&self, request: AuditRequest) -> Result<(), PersistenceError>;

    /// Attach the response outcome to an existing record.
    async fn complete(&self, completion: AuditCompletion) -> Result<(), PersistenceError>;
}
