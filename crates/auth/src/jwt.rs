//! HS256 token issuing and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use storefront_core::UserId;

use crate::{JwtClaims, Role, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to encode token: {0}")]
    Encoding(String),

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

/// Verifies bearer tokens and yields their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Shared-secret HS256 issuer/validator.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issue a token for `user` valid from `now` for the configured lifetime.
    pub fn issue(&self, user: UserId, roles: Vec<Role>, now: DateTime<Utc>) -> Result<String, TokenError> {
        let exp = now.checked_add_signed(self.ttl).ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = JwtClaims {
            sub: user,
            roles,
            iat: now,
            exp,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks are done by `validate_claims` against the caller's clock.
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            },
        )?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_and_carries_roles() {
        let jwt = Hs256Jwt::new(b"test-secret", Duration::days(30));
        let user = UserId::new();
        let now = Utc::now();

        let token = jwt.issue(user, Role::for_account(true), now).unwrap();
        let claims = jwt.validate(&token, now).unwrap();

        assert_eq!(claims.sub, user);
        assert!(claims.is_admin());
        assert_eq!(claims.exp - claims.iat, Duration::days(30));
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let ttl = Duration::try_days(200_000_000).unwrap();
        let jwt = Hs256Jwt::new(b"test-secret", ttl);

        assert_eq!(
            jwt.issue(UserId::new(), vec![Role::customer()], Utc::now()),
            Err(TokenError::ExpiryOutOfRange)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = Hs256Jwt::new(b"secret-a", Duration::days(1));
        let validator = Hs256Jwt::new(b"secret-b", Duration::days(1));
        let now = Utc::now();
        let token = issuer.issue(UserId::new(), vec![Role::customer()], now).unwrap();

        assert_eq!(validator.validate(&token, now), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = Hs256Jwt::new(b"test-secret", Duration::minutes(10));
        let issued = Utc::now() - Duration::hours(1);
        let token = jwt.issue(UserId::new(), vec![Role::customer()], issued).unwrap();

        assert_eq!(
            jwt.validate(&token, Utc::now()),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let jwt = Hs256Jwt::new(b"test-secret", Duration::days(1));
        assert!(matches!(
            jwt.validate("not-a-token", Utc::now()),
            Err(TokenError::Malformed(_))
        ));
    }
}
