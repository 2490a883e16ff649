/// Authentication module
///
/// Token signing/verification, issuance, the verify-or-refresh state
/// machine, revocation, password hashing and identity provisioning.

mod claims;
mod issuer;
mod jwt;
mod password;
mod revoker;
mod service;
mod verifier;

pub use claims::{AccessClaims, AuthenticatedUser, RefreshClaims, Signed, TokenClaims, TokenKind};
pub use issuer::{TokenIssuer, TokenPair};
pub use jwt::TokenCodec;
pub use password::{validate_password_strength, BcryptHasher, PasswordHasher};
pub use revoker::SessionRevoker;
pub use service::AuthService;
pub use verifier::{PresentedTokens, TokenVerifier, Verification, VerificationResult};
