//! Activity log lines emitted after every mutation.

use std::fmt;

use tracing::info;

use super::UserId;

/// Kind of mutation performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    /// A record was created.
    Create,
    /// A record was changed.
    Update,
    /// A record was soft deleted.
    Delete,
}

impl ActivityType {
    /// Lower-case label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emit an activity line describing a mutation of `entity` `id` by `actor`.
pub fn report_activity(
    actor: Option<UserId>,
    activity: ActivityType,
    entity: &'static str,
    id: impl fmt::Display,
) {
    let actor = actor.map(|id| id.get());
    info!(
        activity = activity.as_str(),
        entity,
        entity_id = %id,
        actor,
        "{activity} records related to {entity}: {id}"
    );
}
