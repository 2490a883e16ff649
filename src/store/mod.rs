/// Credential Store
///
/// Contract for the user records the token lifecycle reads from. The only
/// write the core performs is the counter bump on revocation.

mod memory;

pub use memory::InMemoryCredentialStore;

use async_trait::async_trait;

use crate::error::StoreError;

/// Counters wrap back to zero instead of growing without bound.
pub const COUNTER_MODULUS: u64 = u64::MAX;

/// Permission level given to users who sign up without one.
pub const DEFAULT_PERMISSION_LEVEL: &str = "user";

/// A user record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub permission_level: String,
    /// Refresh tokens are honored only while their `count` equals this
    pub invalidation_counter: u64,
}

/// Next counter value after a revocation
pub fn next_counter(current: u64) -> u64 {
    current
        .checked_add(1)
        .map_or(0, |next| next % COUNTER_MODULUS)
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// # Errors
    /// `StoreError::NotFound` if no user has this id
    async fn get_by_id(&self, id: &str) -> Result<Identity, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    /// # Errors
    /// `StoreError::UniqueConstraintViolation` if the id or email is taken
    async fn add(&self, identity: Identity) -> Result<Identity, StoreError>;

    async fn set_counter(&self, id: &str, counter: u64) -> Result<(), StoreError>;

    /// Advance the counter by one and return the new value
    ///
    /// The default is a plain read then write. Stores shared between
    /// concurrent revocations must override it with an atomic update.
    async fn increment_counter(&self, id: &str) -> Result<u64, StoreError> {
        let identity = self.get_by_id(id).await?;
        let next = next_counter(identity.invalidation_counter);
        self.set_counter(id, next).await?;
        Ok(next)
    }
}
