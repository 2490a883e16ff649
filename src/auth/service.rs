/// Authentication Service
///
/// Wires codec, issuer, verifier and revoker from one [`JwtSettings`] and
/// adds identity provisioning (sign-up, sign-in) on top.

use std::sync::{Arc, OnceLock};

use uuid::Uuid;

use crate::auth::issuer::{TokenIssuer, TokenPair};
use crate::auth::jwt::TokenCodec;
use crate::auth::password::{validate_password_strength, BcryptHasher, PasswordHasher};
use crate::auth::revoker::SessionRevoker;
use crate::auth::verifier::{PresentedTokens, TokenVerifier, Verification};
use crate::clock::Clock;
use crate::configuration::{JwtSettings, Settings};
use crate::error::{AppError, AuthError, ErrorContext, StoreError};
use crate::store::{CredentialStore, Identity, DEFAULT_PERMISSION_LEVEL};
use crate::validators::{is_valid_email, is_valid_permission_level, normalize_email};

// Hashed once per service and checked against when an email is unknown, so
// a miss costs the same bcrypt work as a wrong password.
const DUMMY_PASSWORD: &str = "DummyPassword-0000";

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<TokenIssuer>,
    verifier: TokenVerifier,
    revoker: SessionRevoker,
    dummy_hash: OnceLock<String>,
}

impl AuthService {
    /// # Errors
    /// Returns a config error if the JWT settings are unusable
    pub fn new(
        jwt_config: &JwtSettings,
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        jwt_config.validate()?;
        let codec = Arc::new(TokenCodec::new(jwt_config, clock));
        let issuer = Arc::new(TokenIssuer::new(codec.clone(), jwt_config));
        let verifier = TokenVerifier::new(codec, issuer.clone(), store.clone());
        let revoker = SessionRevoker::new(store.clone());

        Ok(Self {
            store,
            hasher,
            issuer,
            verifier,
            revoker,
            dummy_hash: OnceLock::new(),
        })
    }

    /// Build from loaded settings with a bcrypt hasher
    ///
    /// # Errors
    /// Returns a config error if the JWT settings are unusable
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let hasher = Arc::new(BcryptHasher::new(settings.password.cost));
        Self::new(&settings.jwt, store, hasher, clock)
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn revoker(&self) -> &SessionRevoker {
        &self.revoker
    }

    /// Register a new user and issue their first token pair
    ///
    /// # Errors
    /// - Validation errors for a malformed email, weak password or bad permission level
    /// - `AuthError::EmailInUse` if the email is already registered
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        permission_level: Option<&str>,
    ) -> Result<TokenPair, AppError> {
        let context = ErrorContext::new("sign_up");
        let result = self.register(email, password, permission_level).await;
        match &result {
            Ok((id, _)) => tracing::info!(
                request_id = %context.request_id,
                user_id = %id,
                "User registered successfully"
            ),
            Err(e) => context.log_error(e),
        }
        result.map(|(_, tokens)| tokens)
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        permission_level: Option<&str>,
    ) -> Result<(String, TokenPair), AppError> {
        let email = is_valid_email(email)?;
        validate_password_strength(password)?;
        let permission_level =
            is_valid_permission_level(permission_level.unwrap_or(DEFAULT_PERMISSION_LEVEL))?;

        if self.store.get_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailInUse.into());
        }

        let password_hash = self.hash_password(password).await?;
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            permission_level,
            invalidation_counter: 0,
        };

        let identity = self.store.add(identity).await.map_err(|e| match e {
            StoreError::UniqueConstraintViolation(_) => AppError::Auth(AuthError::EmailInUse),
            other => AppError::Store(other),
        })?;

        let tokens = self.issuer.issue_pair(&identity)?;
        Ok((identity.id, tokens))
    }

    /// Check credentials and issue a pair carrying the stored counter
    ///
    /// # Errors
    /// `AuthError::InvalidCredentials` for both an unknown email and a wrong
    /// password, so callers cannot probe for registered addresses
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let context = ErrorContext::new("sign_in");
        let result = self.login(email, password).await;
        match &result {
            Ok((id, _)) => tracing::info!(
                request_id = %context.request_id,
                user_id = %id,
                "User signed in successfully"
            ),
            Err(e) => context.log_error(e),
        }
        result.map(|(_, tokens)| tokens)
    }

    async fn login(&self, email: &str, password: &str) -> Result<(String, TokenPair), AppError> {
        let identity = match self.store.get_by_email(&normalize_email(email)).await? {
            Some(identity) => identity,
            None => {
                let dummy_hash = self.dummy_hash().await?;
                self.verify_password(password, &dummy_hash).await?;
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.verify_password(password, &identity.password_hash).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.issuer.issue_pair(&identity)?;
        Ok((identity.id, tokens))
    }

    pub async fn verify(&self, presented: &PresentedTokens) -> Verification {
        self.verifier.verify(presented).await
    }

    /// Sign the user out everywhere once their access tokens lapse
    pub async fn revoke(&self, id: &str) -> Result<u64, AppError> {
        let context = ErrorContext::new("revoke").with_user_id(id.to_string());
        self.revoker.revoke(id).await.inspect_err(|e| context.log_error(e))
    }

    async fn dummy_hash(&self) -> Result<String, AppError> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash.clone());
        }
        let hash = self.hash_password(DUMMY_PASSWORD).await?;
        Ok(self.dummy_hash.get_or_init(|| hash).clone())
    }

    // bcrypt is CPU-bound; keep it off the async workers
    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?
    }
}
