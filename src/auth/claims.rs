/// Token Claims structures
///
/// Wire shape shared by both token kinds: `iss` and `key` carry the user id,
/// `permissionLevel` the user's permission level and `typ` which kind of
/// token it is. Refresh tokens add `count`, the invalidation counter at
/// issuance. `iat`/`exp` are added by the codec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// A claim set the codec can sign and verify
///
/// `verify` rejects a token whose `typ` differs from `KIND`, so a refresh
/// token never passes as an access token.
pub trait TokenClaims {
    const KIND: TokenKind;

    fn kind(&self) -> TokenKind;
}

/// Claims carried by access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub typ: TokenKind,
    /// Issuer (the user id)
    pub iss: String,
    /// Subject key (the user id)
    pub key: String,
    pub permission_level: String,
}

impl AccessClaims {
    pub fn new(id: &str, permission_level: &str) -> Self {
        Self {
            typ: TokenKind::Access,
            iss: id.to_string(),
            key: id.to_string(),
            permission_level: permission_level.to_string(),
        }
    }
}

impl TokenClaims for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn kind(&self) -> TokenKind {
        self.typ
    }
}

/// Claims carried by refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub typ: TokenKind,
    pub iss: String,
    pub key: String,
    pub permission_level: String,
    /// Invalidation counter snapshot; honored only while it matches the store
    pub count: u64,
}

impl RefreshClaims {
    pub fn new(id: &str, permission_level: &str, count: u64) -> Self {
        Self {
            typ: TokenKind::Refresh,
            iss: id.to_string(),
            key: id.to_string(),
            permission_level: permission_level.to_string(),
            count,
        }
    }
}

impl TokenClaims for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn kind(&self) -> TokenKind {
        self.typ
    }
}

/// A claim set together with its registered timestamps
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Signed<C> {
    #[serde(flatten)]
    pub claims: C,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl<C> Signed<C> {
    /// A token is expired from its `exp` second onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Identity proven by a verified access token
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub permission_level: String,
}

impl From<&AccessClaims> for AuthenticatedUser {
    fn from(claims: &AccessClaims) -> Self {
        Self {
            id: claims.key.clone(),
            permission_level: claims.permission_level.clone(),
        }
    }
}
