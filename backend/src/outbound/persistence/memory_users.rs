//! In-memory user repository.

use std::cmp::Reverse;

use async_trait::async_trait;
use pagination::PageRequest;

use crate::domain::ports::{ListSlice, PersistenceError, UserRepository};
use crate::domain::{EmailAddress, NewUser, User, UserId, UserListFilter};

use super::table::Table;

/// User rows held in process memory. Emails are unique among live users.
#[derive(Debug)]
pub struct MemoryUserRepository {
    table: Table<User>,
}

impl MemoryUserRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            table: Table::new("user"),
        }
    }
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, PersistenceError> {
        let email = user.email.clone();
        self.table
            .insert_unique(
                |existing| !existing.is_deleted() && existing.email == email,
                |id| user.into_user(UserId::new(id)),
            )
            .await
    }

    async fn update(&self, user: &User) -> Result<(), PersistenceError> {
        self.table.replace(user.id.get(), user.clone()).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, PersistenceError> {
        Ok(self.table.get(id.get()).await)
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, PersistenceError> {
        Ok(self
            .table
            .find(|user| !user.is_deleted() && &user.email == email)
            .await)
    }

    async fn list(
        &self,
        filter: &UserListFilter,
        page: PageRequest,
    ) -> Result<ListSlice<User>, PersistenceError> {
        Ok(self
            .table
            .page(
                |user| filter.matches(user),
                |user| Reverse((user.created_at, user.id.get())),
                page,
            )
            .await)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::{PasswordHash, PersonName, UserType};

    fn new_user(email: &str, minutes: i64) -> NewUser {
        let base = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid time");
        NewUser {
            first_name: PersonName::new("Test").expect("name"),
            last_name: PersonName::new(email).expect("name"),
            email: EmailAddress::new(email).expect("email"),
            phone: None,
            user_type: UserType::RegularUser,
            password_hash: PasswordHash::new("hash"),
            created_by: None,
            created_at: base + TimeDelta::minutes(minutes),
        }
    }

    #[fixture]
    fn repo() -> MemoryUserRepository {
        MemoryUserRepository::new()
    }

    #[rstest]
    #[tokio::test]
    async fn assigns_sequential_ids(repo: MemoryUserRepository) {
        let first = repo.insert(new_user("a@example.com", 0)).await.expect("a");
        let second = repo.insert(new_user("b@example.com", 1)).await.expect("b");

        assert_eq!(first.id, UserId::new(1));
        assert_eq!(second.id, UserId::new(2));
    }

    #[rstest]
    #[tokio::test]
    async fn rejects_duplicate_live_email(repo: MemoryUserRepository) {
        repo.insert(new_user("a@example.com", 0)).await.expect("a");

        let error = repo
            .insert(new_user("A@example.com", 1))
            .await
            .expect_err("duplicate");

        assert!(matches!(error, PersistenceError::Conflict { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn lists_newest_first_with_totals(repo: MemoryUserRepository) {
        for (index, email) in ["a@example.com", "b@example.com", "c@example.com"]
            .into_iter()
            .enumerate()
        {
            repo.insert(new_user(email, index as i64))
                .await
                .expect("insert");
        }
        let page = PageRequest::new(1, 2).expect("page");

        let slice = repo
            .list(&UserListFilter::default(), page)
            .await
            .expect("list");

        assert_eq!(slice.total, 3);
        let emails: Vec<_> = slice.items.iter().map(|user| user.email.to_string()).collect();
        assert_eq!(emails, ["c@example.com", "b@example.com"]);
    }

    #[rstest]
    #[tokio::test]
    async fn deleted_users_are_invisible_by_email(repo: MemoryUserRepository) {
        let mut user = repo.insert(new_user("a@example.com", 0)).await.expect("a");
        user.deleted_at = Some(user.created_at);
        repo.update(&user).await.expect("update");

        let email = EmailAddress::new("a@example.com").expect("email");
        assert!(repo.find_by_email(&email).await.expect("find").is_none());
    }
}
