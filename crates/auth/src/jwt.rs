//! HS256 access tokens.
//!
//! The payload carries its own `issued_at`/`expires_at` window (RFC 3339), so
//! the registered `exp` claim is not required; the window is checked with
//! [`validate_claims`] after the signature is verified.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{validate_claims, AccessClaims, TokenValidationError};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed or badly signed token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, JwtError>;
}

/// Symmetric HS256 signer/validator.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `claims`.
    pub fn issue(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, JwtError> {
        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Permission, RoleName};
    use chrono::Duration;
    use tessera_core::{TenantId, UserId};

    fn claims(now: DateTime<Utc>) -> AccessClaims {
        AccessClaims {
            sub: UserId::new(),
            tenant_id: TenantId::new(),
            email: "owner@example.com".to_string(),
            roles: vec![RoleName::new("owner")],
            permissions: vec![Permission::new("roles.view")],
            issued_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn issued_tokens_validate() {
        let jwt = Hs256Jwt::new("secret");
        let now = Utc::now();
        let original = claims(now);

        let token = jwt.issue(&original).unwrap();
        let decoded = jwt.validate(&token, now).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = Hs256Jwt::new("secret").issue(&claims(now)).unwrap();
        let err = Hs256Jwt::new("other").validate(&token, now).unwrap_err();
        assert!(matches!(err, JwtError::Invalid(_)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let jwt = Hs256Jwt::new("secret");
        let now = Utc::now();
        let token = jwt.issue(&claims(now)).unwrap();

        let err = jwt.validate(&token, now + Duration::hours(1)).unwrap_err();
        assert!(matches!(err, JwtError::Claims(TokenValidationError::Expired)));
    }

    #[test]
    fn garbage_is_rejected() {
        let jwt = Hs256Jwt::new("secret");
        assert!(jwt.validate("not.a.jwt", Utc::now()).is_err());
    }
}
