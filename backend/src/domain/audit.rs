//! Request audit records written through the asynchronous side channel.
//!
//! A request with auditing enabled produces two jobs: [`AuditJob::Record`]
//! when it enters the pipeline and [`AuditJob::Complete`] once a response is
//! known. Both carry the same [`RefId`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::UserId;

/// Number of decimal digits in a [`RefId`].
pub const REF_ID_DIGITS: usize = 18;

/// Correlation id tying an audit record to its completion.
///
/// # Examples
/// ```
/// use stockdesk::domain::RefId;
///
/// let id = RefId::generate();
/// assert_eq!(id.as_str().len(), 18);
/// assert!(id.as_str().chars().all(|c| c.is_ascii_digit()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(String);

impl RefId {
    /// Random 18-digit id. The leading digit may be zero.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let digits = (0..REF_ID_DIGITS)
            .map(|_| char::from(b'0' + rng.gen_range(0..10_u8)))
            .collect();
        Self(digits)
    }

    /// Decimal digits.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome recorded against an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    /// Request received, no response yet.
    Pending,
    /// Response rendered without error.
    Success,
    /// Response carried an error or the operation faulted.
    Failed,
}

impl AuditStatus {
    /// Label stored with the record; pending records store an empty label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "",
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }
}

/// Request half of an audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRequest {
    /// Correlation id.
    pub ref_id: RefId,
    /// Caller, when authenticated.
    pub user_id: Option<UserId>,
    /// HTTP method.
    pub method: String,
    /// Path including the query string.
    pub endpoint: String,
    /// Request headers without credentials.
    pub headers: BTreeMap<String, String>,
    /// Raw request body as received.
    pub request_body: String,
    /// Time the request entered the pipeline.
    pub received_at: DateTime<Utc>,
}

/// Response half of an audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCompletion {
    /// Correlation id of the matching [`AuditRequest`].
    pub ref_id: RefId,
    /// Final outcome.
    pub status: AuditStatus,
    /// Rendered response body.
    pub response_body: String,
    /// Time the response was produced.
    pub completed_at: DateTime<Utc>,
}

/// Unit of work handed to the audit dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditJob {
    /// Create the pending record.
    Record(AuditRequest),
    /// Update the record with the response.
    Complete(AuditCompletion),
}

impl AuditJob {
    /// Correlation id the job refers to.
    pub fn ref_id(&self) -> &RefId {
        match self {
            Self::Record(request) => &request.ref_id,
            Self::Complete(completion) => &completion.ref_id,
        }
    }
}

/// Stored audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Request half.
    pub request: AuditRequest,
    /// Current outcome.
    pub status: AuditStatus,
    /// Response body once completed.
    pub response_body: Option<String>,
    /// Last change to the record.
    pub updated_at: DateTime<Utc>,
}

impl AuditEntry {
    /// New pending record.
    pub fn pending(request: AuditRequest) -> Self {
        let updated_at = request.received_at;
        Self {
            request,
            status: AuditStatus::Pending,
            response_body: None,
            updated_at,
        }
    }

    /// Apply a completion to the record.
    pub fn complete(&mut self, completion: AuditCompletion) {
        self.status = completion.status;
        self.response_body = Some(completion.response_body);
        self.updated_at = completion.completed_at;
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    fn request(ref_id: &RefId) -> AuditRequest {
        AuditRequest {
            ref_id: ref_id.clone(),
            user_id: Some(UserId::new(1)),
            method: "POST".to_owned(),
            endpoint: "/api/v1/stocks".to_owned(),
            headers: BTreeMap::new(),
            request_body: "{}".to_owned(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn ref_ids_are_distinct_digit_strings() {
        let a = RefId::generate();
        let b = RefId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), REF_ID_DIGITS);
    }

    #[test]
    fn completion_updates_status_and_body() {
        let ref_id = RefId::generate();
        let mut entry = AuditEntry::pending(request(&ref_id));
        assert_eq!(entry.status.label(), "");

        entry.complete(AuditCompletion {
            ref_id,
            status: AuditStatus::Failed,
            response_body: "{\"message\":\"Server error\"}".to_owned(),
            completed_at: Utc::now(),
        });

        assert_eq!(entry.status, AuditStatus::Failed);
        assert_eq!(entry.status.label(), "Failed");
        assert!(entry.response_body.is_some());
    }

    #[test]
    fn jobs_expose_their_ref_id() {
        let ref_id = RefId::generate();
        let job = AuditJob::Record(request(&ref_id));
        assert_eq!(job.ref_id(), &ref_id);
    }
}
