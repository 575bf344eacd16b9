//! JWT token handling for portal sessions
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - Default expiry is 1 hour
//! - In production, JWT_SECRET must be a strong random value from environment

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::Role;
use crate::types::SluiceError;

/// Payload stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User document id (hex ObjectId)
    pub user_id: String,
    /// User identifier (email/username)
    pub identifier: String,
    /// Portal role granted
    pub role: Role,
    /// Whether the account has completed signup verification
    pub verified: bool,
    /// Token version (for invalidation)
    pub version: i32,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Input for creating a new token
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub identifier: String,
    pub role: Role,
    pub verified: bool,
    pub version: i32,
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short.
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, SluiceError> {
        if secret.is_empty() {
            return Err(SluiceError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < 32 {
            return Err(SluiceError::Config(
                "JWT_SECRET must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Create a validator for dev mode (fixed insecure secret)
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry_seconds: 3600,
        }
    }

    /// Generate a session token for an authenticated user
    pub fn generate_token(&self, input: TokenInput) -> Result<(String, u64), SluiceError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SluiceError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let exp = now + self.expiry_seconds;
        let claims = Claims {
            user_id: input.user_id,
            identifier: input.identifier,
            role: input.role,
            verified: input.verified,
            version: input.version,
            iat: now,
            exp,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok((token, exp))
    }

    /// Validate a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, SluiceError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(data.claims)
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new_dev()
    }

    fn input() -> TokenInput {
        TokenInput {
            user_id: "665f1c0f8b3e4a0001abcdef".into(),
            identifier: "citizen@example.rw".into(),
            role: Role::Applicant,
            verified: true,
            version: 1,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let validator = validator();
        let (token, exp) = validator.generate_token(input()).unwrap();

        let claims = validator.validate_token(&token).unwrap();
        assert_eq!(claims.identifier, "citizen@example.rw");
        assert_eq!(claims.role, Role::Applicant);
        assert!(claims.verified);
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) = validator().generate_token(input()).unwrap();

        let other = JwtValidator::new("another-secret-that-is-long-enough-0000".into(), 3600).unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
        assert!(JwtValidator::new(String::new(), 3600).is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_token_from_header("Bearer "), None);
        assert_eq!(extract_token_from_header("Basic abc"), None);
    }
}
