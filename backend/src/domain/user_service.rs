//! Account management operations.
//!
//! Every read that the HTTP layer performs per request goes through the
//! cache: users by id and email, and the principal derived from a user. Each
//! mutation invalidates the keys it may have made stale.

use std::sync::Arc;

use mockable::Clock;
use pagination::PageRequest;
use tracing::debug;

use super::ports::{CacheKey, ListSlice, PasswordHasher, UserRepository};
use super::{
    ActivityType, CachedLookup, EmailAddress, Error, Freshness, NewUser, OperationResult,
    PasswordPolicy, PersonName, Principal, User, UserId, UserListFilter, UserType,
    report_activity,
};

const ENTITY: &str = "user";

/// Validated input for [`UserService::create_single`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserDraft {
    /// Given name.
    pub first_name: PersonName,
    /// Family name.
    pub last_name: PersonName,
    /// Login address.
    pub email: EmailAddress,
    /// Optional contact number.
    pub phone: Option<String>,
    /// Account classification.
    pub user_type: UserType,
    /// Plain-text password; hashed before it reaches the repository.
    pub password: String,
}

/// Profile changes; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    /// New given name.
    pub first_name: Option<PersonName>,
    /// New family name.
    pub last_name: Option<PersonName>,
}

/// Role and permission names assigned by an operator; `None` keeps the
/// stored list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGrant {
    /// Replacement role names.
    pub roles: Option<Vec<String>>,
    /// Replacement permission names.
    pub permissions: Option<Vec<String>>,
}

fn normalised(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names.dedup();
    names
}

/// User account operations backed by a repository and the shared cache.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    cache: CachedLookup,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Create a service over the given adapters.
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        cache: CachedLookup,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            cache,
            clock,
        }
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.utc()
    }

    pub(crate) fn verify_password(&self, user: &User, secret: &str) -> OperationResult<bool> {
        Ok(self.hasher.verify(secret, &user.password_hash)?)
    }

    pub(crate) fn hash_password(&self, secret: &str) -> OperationResult<super::PasswordHash> {
        Ok(self.hasher.hash(secret)?)
    }

    /// Cache key for a user looked up by id.
    pub fn id_key(id: UserId) -> CacheKey {
        CacheKey::from_parts("user_id", [id])
    }

    /// Cache key for a user looked up by email.
    pub fn email_key(email: &EmailAddress) -> CacheKey {
        CacheKey::from_parts("user_email", [email])
    }

    /// Cache key for the principal derived from a user.
    pub fn principal_key(id: UserId) -> CacheKey {
        CacheKey::from_parts("user", [id.to_string().as_str(), "roles", "permissions"])
    }

    /// Create an account. `actor` is `None` for self-registration.
    pub async fn create_single(
        &self,
        actor: Option<&Principal>,
        draft: NewUserDraft,
    ) -> OperationResult<User> {
        if self.users.find_by_email(&draft.email).await?.is_some() {
            return Err(Error::invalid_request("User with email already exists"));
        }
        let password_hash = self.hasher.hash(&draft.password)?;
        let created_by = actor.map(|principal| principal.user_id);
        let user = self
            .users
            .insert(NewUser {
                first_name: draft.first_name,
                last_name: draft.last_name,
                email: draft.email,
                phone: draft.phone,
                user_type: draft.user_type,
                password_hash,
                created_by,
                created_at: self.clock.utc(),
            })
            .await?;
        report_activity(created_by, ActivityType::Create, ENTITY, user.id);
        self.clear_temp_cache(&user).await;
        Ok(user)
    }

    /// Apply profile changes to `id`. Only the user themselves or a super
    /// admin may do so.
    pub async fn update_single(
        &self,
        actor: &Principal,
        id: UserId,
        changes: UserChanges,
    ) -> OperationResult<User> {
        if !actor.may_act_for(id) {
            return Err(Error::permission_denied());
        }
        let mut user = self.load_live(id).await?;
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        user.updated_at = self.clock.utc();
        self.persist(&user).await?;
        report_activity(Some(actor.user_id), ActivityType::Update, ENTITY, id);
        Ok(user)
    }

    /// Replace the roles and permissions of `id`. Operators only.
    ///
    /// The cached principal is dropped, so the next request made with the
    /// account's token sees the new grants.
    pub async fn grant_access(
        &self,
        actor: &Principal,
        id: UserId,
        grant: AccessGrant,
    ) -> OperationResult<User> {
        if !actor.is_super_admin() {
            return Err(Error::permission_denied());
        }
        let mut user = self.load_live(id).await?;
        if let Some(roles) = grant.roles {
            user.roles = normalised(roles);
        }
        if let Some(permissions) = grant.permissions {
            user.permissions = normalised(permissions);
        }
        user.updated_at = self.clock.utc();
        self.persist(&user).await?;
        report_activity(Some(actor.user_id), ActivityType::Update, ENTITY, id);
        Ok(user)
    }

    /// Soft delete `id`. An account may not delete itself.
    pub async fn delete_single(&self, actor: &Principal, id: UserId) -> OperationResult<()> {
        if actor.user_id == id {
            return Err(Error::invalid_request("Invalid operation."));
        }
        let mut user = self.load_live(id).await?;
        let now = self.clock.utc();
        user.deleted_at = Some(now);
        user.deleted_by = Some(actor.user_id);
        user.is_active = false;
        user.updated_at = now;
        self.persist(&user).await?;
        report_activity(Some(actor.user_id), ActivityType::Delete, ENTITY, id);
        Ok(())
    }

    /// Fetch a live user by id through the cache.
    pub async fn fetch_single_by_id(
        &self,
        actor: &Principal,
        id: UserId,
        freshness: Freshness,
    ) -> OperationResult<User> {
        if !actor.may_act_for(id) {
            return Err(Error::permission_denied());
        }
        self.cached_by_id(id, freshness).await
    }

    pub(crate) async fn cached_by_id(
        &self,
        id: UserId,
        freshness: Freshness,
    ) -> OperationResult<User> {
        self.cache
            .get_or_compute(&Self::id_key(id), freshness, || self.load_live(id))
            .await
    }

    /// Fetch a live user by email through the cache.
    pub async fn find_user_by_email(
        &self,
        email: &EmailAddress,
        freshness: Freshness,
    ) -> OperationResult<User> {
        self.cache
            .get_or_compute(&Self::email_key(email), freshness, || async move {
                self.users
                    .find_by_email(email)
                    .await?
                    .filter(|user| !user.is_deleted())
                    .ok_or_else(|| Error::not_found("User not found"))
            })
            .await
    }

    /// List live users other than the caller, newest first.
    pub async fn fetch_paginated_list(
        &self,
        actor: &Principal,
        keyword: Option<String>,
        page: PageRequest,
    ) -> OperationResult<ListSlice<User>> {
        let filter = UserListFilter {
            keyword: keyword.filter(|value| !value.trim().is_empty()),
            exclude: Some(actor.user_id),
        };
        Ok(self.users.list(&filter, page).await?)
    }

    /// Replace the caller's password after checking the current one.
    pub async fn change_password(
        &self,
        actor: &Principal,
        current_password: &str,
        new_password: &str,
    ) -> OperationResult<()> {
        let mut user = self.load_live(actor.user_id).await?;
        if !self.hasher.verify(current_password, &user.password_hash)? {
            return Err(Error::invalid_request("Access denied, invalid password."));
        }
        PasswordPolicy::RESET
            .check(new_password)
            .map_err(|message| Error::field("new_password", message))?;
        user.password_hash = self.hasher.hash(new_password)?;
        user.updated_at = self.clock.utc();
        self.persist(&user).await?;
        report_activity(Some(actor.user_id), ActivityType::Update, ENTITY, user.id);
        Ok(())
    }

    /// Resolve the principal for `id` through the cache.
    pub async fn resolve_principal(
        &self,
        id: UserId,
        freshness: Freshness,
    ) -> OperationResult<Principal> {
        self.cache
            .get_or_compute(&Self::principal_key(id), freshness, || async move {
                let user = self.load_live(id).await?;
                Ok(Principal::from_user(&user))
            })
            .await
    }

    /// Drop every cached view of `user`.
    pub async fn clear_temp_cache(&self, user: &User) {
        debug!(user_id = %user.id, "clearing cached user views");
        self.cache
            .invalidate_all([
                Self::id_key(user.id),
                Self::email_key(&user.email),
                Self::principal_key(user.id),
            ])
            .await;
    }

    /// Write `user` back and invalidate its cached views.
    pub(crate) async fn persist(&self, user: &User) -> OperationResult<()> {
        self.users.update(user).await?;
        self.clear_temp_cache(user).await;
        Ok(())
    }

    /// Load `id` straight from the repository, treating soft-deleted rows as
    /// missing.
    pub(crate) async fn load_live(&self, id: UserId) -> OperationResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .filter(|user| !user.is_deleted())
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Load by email straight from the repository, including inactive users.
    pub(crate) async fn load_by_email(
        &self,
        email: &EmailAddress,
    ) -> OperationResult<Option<User>> {
        Ok(self
            .users
            .find_by_email(email)
            .await?
            .filter(|user| !user.is_deleted()))
    }
}

#[cfg(test)]
#[path = "user_service_tests.rs"]
mod tests;
