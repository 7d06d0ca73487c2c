//! Per-account favorite locations.
//!
//! Membership is decided by [`same_location`] against the current list, which makes
//! `add` and `merge` idempotent: repeating a call, or merging overlapping batches in
//! any order, converges on the same set of coordinates.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::{
    error::FavoriteError,
    model::{AccountId, Coordinates, Location, LocationCandidate, LocationId, NewLocation, same_location},
    store::AccountStore,
};

/// Ordered favorite list of one account, without persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoriteList {
    entries: Vec<Location>,
}

impl FavoriteList {
    pub fn new(entries: Vec<Location>) -> Self {
        Self { entries }
    }

    pub fn as_slice(&self) -> &[Location] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Location> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, coordinates: Coordinates) -> Option<&Location> {
        self.entries
            .iter()
            .find(|l| same_location(l.coordinates(), coordinates))
    }

    /// Appends `new` unless its coordinates are already present.
    ///
    /// Returns the stored entry and whether it was inserted by this call.
    pub fn add(&mut self, new: NewLocation, now: DateTime<Utc>) -> (Location, bool) {
        if let Some(existing) = self.find(new.coordinates()) {
            return (existing.clone(), false);
        }

        let location = new.into_location(now);
        self.entries.push(location.clone());
        (location, true)
    }

    pub fn remove(&mut self, id: LocationId) -> Option<Location> {
        let idx = self.entries.iter().position(|l| l.id == id)?;
        Some(self.entries.remove(idx))
    }

    /// Adds every valid candidate in order and returns how many were new.
    ///
    /// Invalid candidates are skipped.
    pub fn merge(&mut self, candidates: &[LocationCandidate], now: DateTime<Utc>) -> usize {
        let mut added = 0;

        for candidate in candidates {
            match candidate.validate() {
                Ok(new) => {
                    if self.add(new, now).1 {
                        added += 1;
                    }
                }
                Err(e) => log::debug!("skipping invalid merge candidate: {e}"),
            }
        }

        added
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    pub location: Location,
    pub inserted: bool,
    pub favorites: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub added: usize,
    pub favorites: Vec<Location>,
}

type LockTable = Mutex<HashMap<AccountId, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive access to one account's list. On drop, the account's entry leaves the
/// lock table unless another caller holds or awaits it.
struct AccountLock<'a> {
    locks: &'a LockTable,
    account: AccountId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AccountLock<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.locks.lock();
        if locks
            .get(&self.account)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.account);
        }
    }
}

/// Favorite list operations backed by an [`AccountStore`].
///
/// Every mutation is a read-modify-write of the whole list. Mutations on the same
/// account are serialized so that concurrent adds of one coordinate cannot both insert.
#[derive(Debug)]
pub struct FavoriteStore {
    store: Arc<dyn AccountStore>,
    locks: LockTable,
}

impl FavoriteStore {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_account(&self, account: AccountId) -> AccountLock<'_> {
        let lock = self.locks.lock().entry(account).or_default().clone();

        AccountLock {
            locks: &self.locks,
            account,
            guard: Some(lock.lock_owned().await),
        }
    }

    pub async fn list(&self, account: AccountId) -> Result<Vec<Location>, FavoriteError> {
        Ok(self.store.load_favorites(account).await?)
    }

    pub async fn add(
        &self,
        account: AccountId,
        candidate: &LocationCandidate,
    ) -> Result<AddOutcome, FavoriteError> {
        let new = candidate.validate()?;

        let _lock = self.lock_account(account).await;

        let mut list = FavoriteList::new(self.store.load_favorites(account).await?);
        let (location, inserted) = list.add(new, Utc::now());

        if inserted {
            self.store.save_favorites(account, list.as_slice().to_vec()).await?;
            log::info!("account {account}: added favorite {} ({})", location.name, location.id);
        }

        Ok(AddOutcome {
            location,
            inserted,
            favorites: list.into_vec(),
        })
    }

    pub async fn remove(&self, account: AccountId, id: LocationId) -> Result<Vec<Location>, FavoriteError> {
        let _lock = self.lock_account(account).await;

        let mut list = FavoriteList::new(self.store.load_favorites(account).await?);
        if list.remove(id).is_none() {
            return Err(FavoriteError::NotFound(id));
        }

        self.store.save_favorites(account, list.as_slice().to_vec()).await?;
        log::info!("account {account}: removed favorite {id}");

        Ok(list.into_vec())
    }

    /// Applies a client-side list to the account; writes once, and only if something was added.
    pub async fn merge(
        &self,
        account: AccountId,
        candidates: &[LocationCandidate],
    ) -> Result<MergeOutcome, FavoriteError> {
        let _lock = self.lock_account(account).await;

        let mut list = FavoriteList::new(self.store.load_favorites(account).await?);
        let added = list.merge(candidates, Utc::now());

        if added > 0 {
            self.store.save_favorites(account, list.as_slice().to_vec()).await?;
        }
        log::info!(
            "account {account}: merged {} candidate(s), {added} new",
            candidates.len()
        );

        Ok(MergeOutcome {
            added,
            favorites: list.into_vec(),
        })
    }
}
