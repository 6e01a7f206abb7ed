//! In-memory request audit log.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::domain::ports::{AuditLogRepository, PersistenceError};
use crate::domain::{AuditCompletion, AuditEntry, AuditRequest, RefId};

/// Audit entries keyed by reference id.
#[derive(Debug, Default)]
pub struct MemoryAuditLogRepository {
    entries: DashMap<RefId, AuditEntry>,
}

impl MemoryAuditLogRepository {
    /// Snapshot of the entry recorded under `ref_id`.
    pub fn entry(&self, ref_id: &RefId) -> Option<AuditEntry> {
        self.entries.get(ref_id).map(|entry| entry.value().clone())
    }

    /// Every entry, oldest request first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        let mut entries: Vec<_> = self.entries.iter().map(|entry| entry.value().clone()).collect();
        entries.sort_by_key(|entry| entry.request.received_at);
        entries
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AuditLogRepository for MemoryAuditLogRepository {
    async fn record(&self, request: AuditRequest) -> Result<(), PersistenceError> {
        debug!(ref_id = %request.ref_id, endpoint = %request.endpoint, "audit recorded");
        self.entries
            .insert(request.ref_id.clone(), AuditEntry::pending(request));
        Ok(())
    }

    async fn complete(&self, completion: AuditCompletion) -> Result<(), PersistenceError> {
        match self.entries.get_mut(&completion.ref_id) {
            Some(mut entry) => {
                entry.complete(completion);
                Ok(())
            }
            None => Err(PersistenceError::query(format!(
                "no audit entry for {}",
                completion.ref_id
            ))),
        }
    }
}
