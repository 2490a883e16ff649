/// Token Issuance
///
/// Mints access tokens (short TTL, no counter) and refresh tokens (long TTL,
/// counter snapshot). Permission level and counter come from the caller,
/// either fresh from the store or from a refresh token that already verified.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::auth::jwt::TokenCodec;
use crate::configuration::JwtSettings;
use crate::error::AuthError;
use crate::store::Identity;

/// Access and refresh token, always issued together
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, config: &JwtSettings) -> Self {
        Self {
            codec,
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        }
    }

    pub fn issue_access_token(&self, id: &str, permission_level: &str) -> Result<String, AuthError> {
        self.codec
            .sign(AccessClaims::new(id, permission_level), self.access_ttl)
    }

    pub fn issue_refresh_token(
        &self,
        id: &str,
        permission_level: &str,
        counter: u64,
    ) -> Result<String, AuthError> {
        self.codec.sign(
            RefreshClaims::new(id, permission_level, counter),
            self.refresh_ttl,
        )
    }

    /// Issue both tokens from the identity's current permission level and counter
    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        self.issue_pair_for(
            &identity.id,
            &identity.permission_level,
            identity.invalidation_counter,
        )
    }

    pub(crate) fn issue_pair_for(
        &self,
        id: &str,
        permission_level: &str,
        counter: u64,
    ) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(id, permission_level)?,
            refresh_token: self.issue_refresh_token(id, permission_level, counter)?,
        })
    }
}
