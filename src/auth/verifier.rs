/// Token Verification and Silent Refresh
///
/// Decides whether a presented (access, refresh) pair authenticates a user:
///
/// 1. Both tokens verify: authenticated from the access claims, pair echoed.
/// 2. Access token expired: fall back to the refresh token. If it verifies
///    and its `count` still matches the store, both tokens are re-issued
///    with the same `count`; otherwise unauthenticated.
/// 3. Anything else (absent, tampered, malformed): unauthenticated without
///    consulting the refresh token or the store.
///
/// Every failure is logged with its kind and collapsed to
/// [`VerificationResult::Unauthenticated`] with a cleared pair.

use std::sync::Arc;

use crate::auth::claims::{AccessClaims, AuthenticatedUser, RefreshClaims};
use crate::auth::issuer::{TokenIssuer, TokenPair};
use crate::auth::jwt::TokenCodec;
use crate::error::{AppError, AuthError, StoreError};
use crate::store::CredentialStore;

/// Tokens as delivered by the carrier; `None` means nothing was sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentedTokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl PresentedTokens {
    /// Empty strings count as absent
    pub fn new(access: Option<&str>, refresh: Option<&str>) -> Self {
        let present = |token: Option<&str>| {
            token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        };
        Self {
            access: present(access),
            refresh: present(refresh),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

impl From<&TokenPair> for PresentedTokens {
    fn from(pair: &TokenPair) -> Self {
        Self::new(Some(&pair.access_token), Some(&pair.refresh_token))
    }
}

impl From<TokenPair> for PresentedTokens {
    fn from(pair: TokenPair) -> Self {
        Self::from(&pair)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Authenticated(AuthenticatedUser),
    Unauthenticated,
}

/// Outcome of a verification plus the pair the caller should hand back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub result: VerificationResult,
    /// `None` means the carrier should clear both tokens
    pub tokens: Option<TokenPair>,
}

impl Verification {
    fn authenticated(user: AuthenticatedUser, tokens: TokenPair) -> Self {
        Self {
            result: VerificationResult::Authenticated(user),
            tokens: Some(tokens),
        }
    }

    fn unauthenticated() -> Self {
        Self {
            result: VerificationResult::Unauthenticated,
            tokens: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.result, VerificationResult::Authenticated(_))
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match &self.result {
            VerificationResult::Authenticated(user) => Some(user),
            VerificationResult::Unauthenticated => None,
        }
    }
}

pub struct TokenVerifier {
    codec: Arc<TokenCodec>,
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn CredentialStore>,
}

impl TokenVerifier {
    pub fn new(
        codec: Arc<TokenCodec>,
        issuer: Arc<TokenIssuer>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            codec,
            issuer,
            store,
        }
    }

    /// Never fails; callers only learn authenticated or not.
    pub async fn verify(&self, presented: &PresentedTokens) -> Verification {
        match self.authenticate(presented).await {
            Ok(verification) => verification,
            Err(e) => {
                match &e {
                    AppError::Auth(AuthError::CounterMismatch) => {
                        tracing::warn!(error = %e, "Refresh token rejected")
                    }
                    AppError::Auth(_) => tracing::debug!(error = %e, "Token verification failed"),
                    _ => tracing::error!(error = %e, "Token verification aborted"),
                }
                Verification::unauthenticated()
            }
        }
    }

    async fn authenticate(&self, presented: &PresentedTokens) -> Result<Verification, AppError> {
        let access = presented.access.as_deref().ok_or(AuthError::MissingToken)?;

        match self.codec.verify::<AccessClaims>(access) {
            Ok(signed) => {
                let refresh = presented.refresh.as_deref().ok_or(AuthError::MissingToken)?;
                self.codec.verify::<RefreshClaims>(refresh)?;

                let user = AuthenticatedUser::from(&signed.claims);
                let tokens = TokenPair {
                    access_token: access.to_string(),
                    refresh_token: refresh.to_string(),
                };
                Ok(Verification::authenticated(user, tokens))
            }
            Err(AuthError::TokenExpired) => self.refresh(presented.refresh.as_deref()).await,
            Err(e) => Err(e.into()),
        }
    }

    async fn refresh(&self, refresh: Option<&str>) -> Result<Verification, AppError> {
        let refresh = refresh.ok_or(AuthError::MissingToken)?;
        let RefreshClaims {
            key: id,
            permission_level,
            count,
            ..
        } = self.codec.verify::<RefreshClaims>(refresh)?.claims;

        let identity = self.store.get_by_id(&id).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::Auth(AuthError::IdentityNotFound),
            other => AppError::Store(other),
        })?;

        if identity.invalidation_counter != count {
            tracing::warn!(
                user_id = %id,
                token_count = count,
                current_count = identity.invalidation_counter,
                "Refresh token predates a revocation"
            );
            return Err(AuthError::CounterMismatch.into());
        }

        let tokens = self.issuer.issue_pair_for(&id, &permission_level, count)?;
        tracing::info!(user_id = %id, "Access token refreshed");

        let user = AuthenticatedUser { id, permission_level };
        Ok(Verification::authenticated(user, tokens))
    }
}
