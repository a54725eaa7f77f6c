use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    ReadingTx, StoreError, WaterStore, READING_OWNER_DATE_KEY, USERS_EMAIL_KEY,
    USERS_USERNAME_KEY,
};
use crate::domain::{NewReading, NewUser, Reading, ReadingId, Tariff, User, UserId};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    readings: BTreeMap<ReadingId, Reading>,
    tariffs: Vec<Tariff>,
    users: BTreeMap<UserId, User>,
    last_reading_id: ReadingId,
    last_tariff_id: i64,
    last_user_id: UserId,
}

impl MemoryState {
    fn owned_by(&self, owner: UserId) -> impl Iterator<Item = &Reading> {
        self.readings.values().filter(move |r| r.owner_id == owner)
    }
}

/// Process-local store used when no database is configured, and by tests.
///
/// A transaction holds the state lock until it is committed or dropped, so
/// transactions are fully serialized. Foreign keys are not enforced.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl ReadingTx for MemoryTx {
    async fn find_by_id(&mut self, id: ReadingId) -> Result<Option<Reading>, StoreError> {
        Ok(self.staged.readings.get(&id).cloned())
    }

    async fn find_by_owner_and_date(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError> {
        Ok(self.staged.owned_by(owner).find(|r| r.date == date).cloned())
    }

    async fn find_latest_before(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError> {
        Ok(self
            .staged
            .owned_by(owner)
            .filter(|r| r.date < date)
            .max_by_key(|r| r.date)
            .cloned())
    }

    async fn find_earliest_after(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError> {
        Ok(self
            .staged
            .owned_by(owner)
            .filter(|r| r.date > date)
            .min_by_key(|r| r.date)
            .cloned())
    }

    async fn find_last_n(
        &mut self,
        owner: UserId,
        before: Date,
        n: usize,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut earlier: Vec<Reading> = self
            .staged
            .owned_by(owner)
            .filter(|r| r.date < before)
            .cloned()
            .collect();
        earlier.sort_by(|a, b| b.date.cmp(&a.date));
        earlier.truncate(n);
        Ok(earlier)
    }

    async fn insert(&mut self, reading: NewReading) -> Result<Reading, StoreError> {
        if self
            .staged
            .owned_by(reading.owner_id)
            .any(|r| r.date == reading.date)
        {
            return Err(StoreError::UniqueViolation(READING_OWNER_DATE_KEY.to_string()));
        }

        self.staged.last_reading_id += 1;
        let stored = reading.with_id(self.staged.last_reading_id);
        self.staged.readings.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&mut self, reading: &Reading) -> Result<(), StoreError> {
        if let Some(existing) = self.staged.readings.get_mut(&reading.id) {
            *existing = reading.clone();
        }
        Ok(())
    }

    async fn delete(&mut self, id: ReadingId) -> Result<(), StoreError> {
        self.staged.readings.remove(&id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl WaterStore for MemoryStore {
    async fn begin(&self, _owner: UserId) -> Result<Box<dyn ReadingTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn list_readings(&self, owner: UserId) -> Result<Vec<Reading>, StoreError> {
        let state = self.state.lock().await;
        let mut readings: Vec<Reading> = state.owned_by(owner).cloned().collect();
        readings.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(readings)
    }

    async fn current_tariff(&self) -> Result<Option<Tariff>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .tariffs
            .iter()
            .max_by_key(|t| (t.set_at, t.id))
            .cloned())
    }

    async fn insert_tariff(
        &self,
        cost_per_unit: f64,
        set_at: OffsetDateTime,
    ) -> Result<Tariff, StoreError> {
        let mut state = self.state.lock().await;
        state.last_tariff_id += 1;
        let tariff = Tariff {
            id: state.last_tariff_id,
            cost_per_unit,
            set_at,
        };
        state.tariffs.push(tariff.clone());
        Ok(tariff)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation(USERS_USERNAME_KEY.to_string()));
        }
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string()));
        }

        state.last_user_id += 1;
        let stored = user.with_id(state.last_user_id);
        state.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let removed = state.users.remove(&id).is_some();
        state.readings.retain(|_, r| r.owner_id != id);
        Ok(removed)
    }
}
