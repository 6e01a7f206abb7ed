//! Keyed row storage shared by the in-memory repositories.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use pagination::PageRequest;
use tokio::sync::RwLock;

use crate::domain::ports::{ListSlice, PersistenceError};

/// Rows keyed by a sequential `u64` primary key.
#[derive(Debug)]
pub(crate) struct Table<T> {
    name: &'static str,
    rows: RwLock<BTreeMap<u64, T>>,
    next_id: AtomicU64,
}

impl<T: Clone> Table<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert the row built for the next key unless `conflicts` matches an
    /// existing row.
    pub(crate) async fn insert_unique(
        &self,
        conflicts: impl Fn(&T) -> bool,
        build: impl FnOnce(u64) -> T,
    ) -> Result<T, PersistenceError> {
        let mut rows = self.rows.write().await;
        if rows.values().any(conflicts) {
            return Err(PersistenceError::conflict(format!(
                "duplicate {} row",
                self.name
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let row = build(id);
        rows.insert(id, row.clone());
        Ok(row)
    }

    pub(crate) async fn insert(
        &self,
        build: impl FnOnce(u64) -> T,
    ) -> Result<T, PersistenceError> {
        self.insert_unique(|_| false, build).await
    }

    /// Replace the row stored under `id`.
    pub(crate) async fn replace(&self, id: u64, row: T) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(slot) => {
                *slot = row;
                Ok(())
            }
            None => Err(PersistenceError::query(format!(
                "{} {id} does not exist",
                self.name
            ))),
        }
    }

    pub(crate) async fn get(&self, id: u64) -> Option<T> {
        self.rows.read().await.get(&id).cloned()
    }

    pub(crate) async fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.rows.read().await.values().find(|row| predicate(row)).cloned()
    }

    /// Page through the rows matching `predicate`, ordered by `order`.
    pub(crate) async fn page<K: Ord>(
        &self,
        predicate: impl Fn(&T) -> bool,
        order: impl Fn(&T) -> K,
        page: PageRequest,
    ) -> ListSlice<T> {
        let rows = self.rows.read().await;
        let mut matched: Vec<&T> = rows.values().filter(|row| predicate(row)).collect();
        matched.sort_by_key(|row| order(row));
        let total = matched.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(page.page_size()).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(size)
            .cloned()
            .collect();
        ListSlice { items, total }
    }
}
