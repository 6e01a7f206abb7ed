//! Port abstraction for user persistence adapters.
use async_trait::async_trait;
use pagination::PageRequest;

use crate::domain::{EmailAddress, NewUser, User, UserId, UserListFilter};

use super::{ListSlice, PersistenceError};

/// Storage of user accounts, soft-deleted rows included.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user and return the stored record.
    async fn insert(&self, user: NewUser) -> Result<User, PersistenceError>;

    /// Replace the stored record with `user`.
    async fn update(&self, user: &User) -> Result<(), PersistenceError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, PersistenceError>;

    /// Fetch a user by normalised email.
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, PersistenceError>;

    /// Page through users matching `filter`, newest first.
    async fn list(
        &self,
        filter: &UserListFilter,
        page: PageRequest,
    ) -> Result<ListSlice<User>, PersistenceError>;
}
