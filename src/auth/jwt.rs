/// JWT Token Signing and Verification
///
/// HS256 over a symmetric secret. Expiry is set and checked against the
/// injected [`Clock`], not the JWT library's wall clock, so the two failure
/// kinds the verifier branches on stay deterministic in tests.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::claims::{Signed, TokenClaims};
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::AuthError;

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is checked in `verify` against our clock
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            clock,
        }
    }

    /// Sign a claim set that expires `ttl` from now
    ///
    /// # Errors
    /// Fails if the claims cannot be serialized or the expiry overflows
    pub fn sign<C: Serialize>(&self, claims: C, ttl: Duration) -> Result<String, AuthError> {
        let now = self.clock.now().timestamp();
        let exp = now.checked_add(ttl.num_seconds()).ok_or_else(|| {
            tracing::error!(ttl_seconds = ttl.num_seconds(), "Token expiry out of range");
            AuthError::TokenInvalid
        })?;
        let signed = Signed {
            claims,
            iat: now,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &signed, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Token signing failed");
            AuthError::TokenInvalid
        })
    }

    /// Verify signature and structure, then expiry
    ///
    /// # Errors
    /// - `TokenInvalid` if the token is malformed, tampered with, missing `exp`,
    ///   or of the wrong kind
    /// - `TokenExpired` if the token is well-signed but past its `exp`
    pub fn verify<C>(&self, token: &str) -> Result<Signed<C>, AuthError>
    where
        C: DeserializeOwned + TokenClaims,
    {
        let data = decode::<Signed<C>>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token failed signature or structure check");
            AuthError::TokenInvalid
        })?;

        if data.claims.claims.kind() != C::KIND {
            tracing::warn!(
                expected = ?C::KIND,
                found = ?data.claims.claims.kind(),
                "Token presented in the wrong slot"
            );
            return Err(AuthError::TokenInvalid);
        }

        if data.claims.is_expired_at(self.clock.now()) {
            return Err(AuthError::TokenExpired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::claims::{AccessClaims, RefreshClaims};
    use crate::clock::ManualClock;

    pub(crate) fn get_test_config() -> JwtSettings {
        JwtSettings::new("test-secret-key-at-least-32-characters-long")
    }

    /// Flip the first character of the signature segment
    pub(crate) fn tamper_signature(token: &str) -> String {
        let (head, signature) = token.rsplit_once('.').expect("three-part token");
        let mut chars: Vec<char> = signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, chars.into_iter().collect::<String>())
    }

    fn codec_with_clock() -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let codec = TokenCodec::new(&get_test_config(), clock.clone());
        (codec, clock)
    }

    #[test]
    fn test_sign_and_verify_token() {
        let (codec, _) = codec_with_clock();
        let token = codec
            .sign(AccessClaims::new("u1", "user"), Duration::minutes(5))
            .expect("Failed to sign token");

        let signed = codec.verify::<AccessClaims>(&token).expect("Failed to verify token");
        assert_eq!(signed.claims.key, "u1");
        assert_eq!(signed.claims.iss, "u1");
        assert_eq!(signed.claims.permission_level, "user");
        assert_eq!(signed.exp - signed.iat, 300);
    }

    #[test]
    fn test_expired_token() {
        let (codec, clock) = codec_with_clock();
        let token = codec
            .sign(AccessClaims::new("u1", "user"), Duration::minutes(5))
            .unwrap();

        clock.advance(Duration::minutes(5));
        assert_eq!(
            codec.verify::<AccessClaims>(&token).unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[test]
    fn test_valid_until_expiry() {
        let (codec, clock) = codec_with_clock();
        let token = codec
            .sign(AccessClaims::new("u1", "user"), Duration::minutes(5))
            .unwrap();

        clock.advance(Duration::seconds(299));
        assert!(codec.verify::<AccessClaims>(&token).is_ok());
    }

    #[test]
    fn test_invalid_token() {
        let (codec, _) = codec_with_clock();
        let result = codec.verify::<AccessClaims>("invalid.token.here");
        assert_eq!(result.unwrap_err(), AuthError::TokenInvalid);
    }

    #[test]
    fn test_tampered_token() {
        let (codec, _) = codec_with_clock();
        let token = codec
            .sign(AccessClaims::new("u1", "user"), Duration::minutes(5))
            .unwrap();

        let result = codec.verify::<AccessClaims>(&tamper_signature(&token));
        assert_eq!(result.unwrap_err(), AuthError::TokenInvalid);
    }

    #[test]
    fn test_tampered_expired_token_is_invalid() {
        let (codec, clock) = codec_with_clock();
        let token = codec
            .sign(AccessClaims::new("u1", "user"), Duration::minutes(5))
            .unwrap();

        clock.advance(Duration::hours(1));
        let result = codec.verify::<AccessClaims>(&tamper_signature(&token));
        assert_eq!(result.unwrap_err(), AuthError::TokenInvalid);
    }

    #[test]
    fn test_wrong_secret() {
        let (codec, _) = codec_with_clock();
        let token = codec
            .sign(AccessClaims::new("u1", "user"), Duration::minutes(5))
            .unwrap();

        let other = TokenCodec::new(
            &JwtSettings::new("a-completely-different-secret-value!"),
            Arc::new(ManualClock::default()),
        );
        assert_eq!(
            other.verify::<AccessClaims>(&token).unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn test_access_token_lacks_count() {
        let (codec, _) = codec_with_clock();
        let token = codec
            .sign(AccessClaims::new("u1", "user"), Duration::minutes(5))
            .unwrap();

        assert_eq!(
            codec.verify::<RefreshClaims>(&token).unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let (codec, _) = codec_with_clock();
        let token = codec
            .sign(RefreshClaims::new("u1", "user", 0), Duration::minutes(8440))
            .unwrap();

        assert!(codec.verify::<RefreshClaims>(&token).is_ok());
        assert_eq!(
            codec.verify::<AccessClaims>(&token).unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn test_token_without_kind_is_invalid() {
        let (codec, clock) = codec_with_clock();
        let now = clock.now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({
                "iss": "u1",
                "key": "u1",
                "permissionLevel": "user",
                "iat": now,
                "exp": now + 300,
            }),
            &EncodingKey::from_secret(get_test_config().secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            codec.verify::<AccessClaims>(&token).unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn test_missing_exp_is_invalid() {
        let (codec, _) = codec_with_clock();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &AccessClaims::new("u1", "user"),
            &EncodingKey::from_secret(get_test_config().secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            codec.verify::<AccessClaims>(&token).unwrap_err(),
            AuthError::TokenInvalid
        );
    }
}
