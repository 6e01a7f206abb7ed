//! In-process audit job queue.
//!
//! [`ChannelAuditQueue`] implements the `AuditDispatcher` port on top of a
//! bounded Tokio channel. Dispatch never waits: a full queue rejects the job
//! and the caller logs and moves on. [`AuditWorker`] drains the channel into
//! an `AuditLogRepository`, applying jobs in dispatch order so a completion
//! always follows its record.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::domain::AuditJob;
use crate::domain::ports::{AuditDispatcher, AuditLogRepository, JobDispatchError};

/// Sending half of the audit queue.
#[derive(Debug, Clone)]
pub struct ChannelAuditQueue {
    sender: mpsc::Sender<AuditJob>,
}

/// Receiving half of the audit queue bound to its repository.
pub struct AuditWorker {
    receiver: mpsc::Receiver<AuditJob>,
    repository: Arc<dyn AuditLogRepository>,
}

/// Create a queue holding at most `capacity` pending jobs and the worker that
/// drains it into `repository`.
pub fn audit_channel(
    capacity: usize,
    repository: Arc<dyn AuditLogRepository>,
) -> (ChannelAuditQueue, AuditWorker) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        ChannelAuditQueue { sender },
        AuditWorker {
            receiver,
            repository,
        },
    )
}

impl AuditDispatcher for ChannelAuditQueue {
    fn dispatch(&self, job: AuditJob) -> Result<(), JobDispatchError> {
        let ref_id = job.ref_id().clone();
        self.sender.try_send(job).map_err(|error| match error {
            TrySendError::Full(_) => {
                JobDispatchError::rejected(format!("queue full, dropped {ref_id}"))
            }
            TrySendError::Closed(_) => JobDispatchError::unavailable("audit worker stopped"),
        })
    }
}

impl AuditWorker {
    /// Apply jobs until every sender has been dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.receiver.recv().await {
            self.apply(job).await;
        }
        debug!("audit queue closed");
    }

    async fn apply(&self, job: AuditJob) {
        let ref_id = job.ref_id().clone();
        let outcome = match job {
            AuditJob::Record(request) => self.repository.record(request).await,
            AuditJob::Complete(completion) => self.repository.complete(completion).await,
        };
        if let Err(error) = outcome {
            warn!(%error, ref_id = %ref_id, "audit job failed");
        }
    }
}
