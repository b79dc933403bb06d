//! JWT issuing and verification.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tillpoint_core::{Role, UserId, UserProfile};

use super::AuthError;

/// Claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID, carried as a string as registered claims require.
    #[serde(with = "subject")]
    pub sub: i32,
    pub username: String,
    /// Display name.
    pub name: String,
    pub role: Role,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// The profile the token was issued for.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: UserId::new(self.sub),
            username: self.username.clone(),
            display_name: self.name.clone(),
            role: self.role,
        }
    }
}

mod subject {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(sub: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(sub)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Why a presented token was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature valid but past its expiry.
    #[error("token expired")]
    Expired,
    /// Malformed, wrongly signed, or otherwise unusable.
    #[error("invalid token")]
    Invalid,
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer for `secret` whose tokens live for `ttl`.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
            ttl,
        }
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user`, valid from now for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue(&self, user: &UserProfile) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.issue_with_expiry(user, now, now.saturating_add(ttl))
    }

    /// Issue a token with explicit issue and expiry times.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue_with_expiry(
        &self,
        user: &UserProfile,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.id.as_i32(),
            username: user.username.clone(),
            name: user.display_name.clone(),
            role: user.role,
            iat: issued_at,
            exp: expires_at,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for a correctly signed token past its
    /// expiry, `TokenError::Invalid` for anything else.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&SecretString::from(secret), Duration::from_secs(3600))
    }

    fn cashier() -> UserProfile {
        UserProfile {
            id: UserId::new(12),
            username: "till1".to_owned(),
            display_name: "Front Till".to_owned(),
            role: Role::Cashier,
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let issuer = issuer("k3y-for-tests-0123456789-abcdefghij");
        let token = issuer.issue(&cashier()).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.profile(), cashier());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_subject_is_a_string_claim() {
        let claims = Claims {
            sub: 12,
            username: "till1".to_owned(),
            name: "Front Till".to_owned(),
            role: Role::Cashier,
            iat: 0,
            exp: 1,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["sub"], "12");

        let back: Claims = serde_json::from_value(value).unwrap();
        assert_eq!(back, claims);
    }

    #[test]
    fn test_non_numeric_subject_is_invalid() {
        let secret = "k3y-for-tests-0123456789-abcdefghij";
        let now = Utc::now().timestamp();
        let payload = serde_json::json!({
            "sub": "nobody",
            "username": "x",
            "name": "x",
            "role": "cashier",
            "iat": now,
            "exp": now + 60,
        });
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(issuer(secret).verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer("k3y-for-tests-0123456789-abcdefghij");
        let now = Utc::now().timestamp();
        let token = issuer
            .issue_with_expiry(&cashier(), now - 7200, now - 3600)
            .unwrap();

        assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issuer("k3y-for-tests-0123456789-abcdefghij")
            .issue(&cashier())
            .unwrap();
        let other = issuer("another-k3y-9876543210-zyxwvutsrq");

        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let issuer = issuer("k3y-for-tests-0123456789-abcdefghij");
        assert_eq!(issuer.verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(issuer.verify(""), Err(TokenError::Invalid));
    }
}
