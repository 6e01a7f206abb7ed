//! Shared doubles for the domain service tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use super::ports::{CacheKey, CacheStore, CacheStoreError};
use super::{
    CachedLookup, EmailAddress, NewUser, PasswordHash, PersonName, Principal, User, UserId,
    UserType,
};

/// In-process cache store that records every key it holds.
#[derive(Default)]
pub(crate) struct MapStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MapStore {
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.lock().expect("store lock").contains_key(key)
    }
}

#[async_trait]
impl CacheStore for MapStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        Ok(self
            .entries
            .lock()
            .expect("store lock")
            .get(key.as_str())
            .cloned())
    }

    async fn put(&self, key: &CacheKey, value: String) -> Result<(), CacheStoreError> {
        self.entries
            .lock()
            .expect("store lock")
            .insert(key.as_str().to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheStoreError> {
        self.entries.lock().expect("store lock").remove(key.as_str());
        Ok(())
    }
}

pub(crate) fn lookup(store: &Arc<MapStore>) -> CachedLookup {
    CachedLookup::new(store.clone())
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9)
        .single()
        .expect("valid fixture timestamp")
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

pub(crate) fn user(id: u64, email: &str, user_type: UserType) -> User {
    NewUser {
        first_name: PersonName::new("Test").expect("name"),
        last_name: PersonName::new(format!("User{id}")).expect("name"),
        email: EmailAddress::new(email).expect("email"),
        phone: None,
        user_type,
        password_hash: PasswordHash::new(format!("hash:{id}")),
        created_by: None,
        created_at: fixture_timestamp(),
    }
    .into_user(UserId::new(id))
}

pub(crate) fn principal(user: &User) -> Principal {
    Principal::from_user(user)
}
