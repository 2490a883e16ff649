use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::{next_counter, CredentialStore, Identity};

/// Credential store held in process memory
///
/// Every operation runs under one lock, so `increment_counter` is atomic.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<String, Identity>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Identity>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_by_id(&self, id: &str) -> Result<Identity, StoreError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.lock().values().find(|u| u.email == email).cloned())
    }

    async fn add(&self, identity: Identity) -> Result<Identity, StoreError> {
        let mut users = self.lock();
        if users.contains_key(&identity.id) {
            return Err(StoreError::UniqueConstraintViolation(
                "id already registered".to_string(),
            ));
        }
        if users.values().any(|u| u.email == identity.email) {
            return Err(StoreError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            ));
        }
        users.insert(identity.id.clone(), identity.clone());
        Ok(identity)
    }

    async fn set_counter(&self, id: &str, counter: u64) -> Result<(), StoreError> {
        let mut users = self.lock();
        let user = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.invalidation_counter = counter;
        Ok(())
    }

    async fn increment_counter(&self, id: &str) -> Result<u64, StoreError> {
        let mut users = self.lock();
        let user = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.invalidation_counter = next_counter(user.invalidation_counter);
        Ok(user.invalidation_counter)
    }
}
