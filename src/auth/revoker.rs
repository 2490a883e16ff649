/// Session Revocation
///
/// Bumping a user's invalidation counter makes every refresh token issued
/// before the bump fail the counter check on its next use. Access tokens
/// already handed out stay valid until they expire.

use std::sync::Arc;

use crate::error::AppError;
use crate::store::CredentialStore;

pub struct SessionRevoker {
    store: Arc<dyn CredentialStore>,
}

impl SessionRevoker {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Invalidate all outstanding refresh tokens for `id`
    ///
    /// Returns the new counter value.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if the user does not exist
    pub async fn revoke(&self, id: &str) -> Result<u64, AppError> {
        let counter = self.store.increment_counter(id).await?;
        tracing::info!(user_id = %id, counter, "All refresh tokens revoked for user");
        Ok(counter)
    }
}
