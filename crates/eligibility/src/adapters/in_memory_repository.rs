// Rust guideline compliant 2026-10-17

//! In-memory adapter for the `RecipientRepository` and `SettingsRepository`
//! ports.
//!
//! Intended for the demo binary and unit tests. Every write runs under one
//! write lock, which makes `bulk_update` all-or-nothing.

use std::sync::{Mutex, PoisonError, RwLock};

use domain::{
    NewRecipient, Recipient, RecipientId, RecipientQuery, RecipientRepository, RepositoryError,
    ScoreUpdate, Setting, SettingsRepository,
};

/// Repository adapter backed by a `Vec<Recipient>` kept in id order.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    recipients: RwLock<Vec<Recipient>>,
    setting: Mutex<Option<Setting>>,
}

impl InMemoryRepository {
    /// Create an empty repository with no stored setting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `recipients`, assigning consecutive ids, and return those ids.
    pub fn insert_many(&self, recipients: Vec<NewRecipient>) -> Vec<RecipientId> {
        let mut stored = self.recipients.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = stored.last().map_or(1, |r| r.id.0 + 1);
        let mut ids = Vec::with_capacity(recipients.len());
        for r in recipients {
            let id = RecipientId(next);
            next += 1;
            stored.push(r.into_recipient(id));
            ids.push(id);
        }
        ids
    }
}

impl RecipientRepository for InMemoryRepository {
    async fn find_by_name(&self, query: &RecipientQuery) -> Result<Vec<Recipient>, RepositoryError> {
        let stored = self.recipients.read().unwrap_or_else(PoisonError::into_inner);
        Ok(stored.iter().filter(|r| query.matches(r)).cloned().collect())
    }

    async fn all(&self) -> Result<Vec<Recipient>, RepositoryError> {
        Ok(self.recipients.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn by_ids(&self, ids: &[RecipientId]) -> Result<Vec<Recipient>, RepositoryError> {
        let stored = self.recipients.read().unwrap_or_else(PoisonError::into_inner);
        Ok(stored.iter().filter(|r| ids.contains(&r.id)).cloned().collect())
    }

    /// Unknown ids are ignored.
    async fn bulk_update(&self, updates: Vec<ScoreUpdate>) -> Result<(), RepositoryError> {
        let mut stored = self.recipients.write().unwrap_or_else(PoisonError::into_inner);
        for u in updates {
            if let Ok(pos) = stored.binary_search_by_key(&u.id, |r| r.id) {
                stored[pos].saw_score = Some(u.saw_score);
                stored[pos].label = Some(u.label);
            }
        }
        Ok(())
    }
}

impl SettingsRepository for InMemoryRepository {
    async fn load_or_init(&self) -> Result<Setting, RepositoryError> {
        let mut setting = self.setting.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(*setting.get_or_insert_with(Setting::default))
    }

    async fn save(&self, setting: Setting) -> Result<(), RepositoryError> {
        *self.setting.lock().unwrap_or_else(PoisonError::into_inner) = Some(setting);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
