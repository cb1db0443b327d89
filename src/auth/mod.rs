use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub user_id: i64,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header must use Bearer token format")]
    MalformedHeader,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("JWT generation error: {0}")]
    Issue(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: u64,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expiry_hours)
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires_at = i64::try_from(self.expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| AuthError::Issue(format!("token lifetime of {} hours is out of range", self.expiry_hours)))?;
        let claims = Claims {
            email: email.to_string(),
            user_id,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| AuthError::Issue(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }
}

/// Hash a password with Argon2id. CPU-bound; call from `spawn_blocking`.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC hash. A malformed hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_user() {
        let tokens = TokenService::new("test-secret", 8);
        let token = tokens.issue(42, "cat@example.com").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "cat@example.com");
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = TokenService::new("one", 8).issue(1, "a@example.com").unwrap();
        let err = TokenService::new("two", 8).verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::Invalid));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = TokenService::new("test-secret", 8);
        let claims = Claims {
            email: "a@example.com".into(),
            user_id: 1,
            exp: Utc::now().timestamp() - 60,
            iat: Utc::now().timestamp() - 120,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();
        assert!(matches!(tokens.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn absurd_lifetime_fails_to_issue() {
        let tokens = TokenService::new("test-secret", u64::MAX);
        assert!(matches!(tokens.issue(1, "a@example.com"), Err(AuthError::Issue(_))));
    }

    #[test]
    fn garbage_is_invalid() {
        let tokens = TokenService::new("test-secret", 8);
        assert!(matches!(tokens.verify("not.a.token"), Err(AuthError::Invalid)));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }
}
