//! Authentication
//!
//! Bearer tokens carry the staff member's numeric user id and role. The role
//! is resolved into an [`Actor`] once per request; handlers never look at the
//! raw claims.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::{Actor, Role, UserId};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (numeric user id)
    pub sub: String,
    /// Staff role, e.g. `cashier`
    pub role: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// Resolves the claims into the acting staff member
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let user_id: i64 = self
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidSubject(self.sub.clone()))?;
        let role: Role = self.role.parse().map_err(AuthError::UnknownRole)?;
        Ok(Actor::new(UserId::new(user_id), role))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid subject '{0}'")]
    InvalidSubject(String),
    #[error("{0}")]
    UnknownRole(String),
}

/// Creates a signed token for a staff member
pub fn create_token(
    user_id: UserId,
    role: Role,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.value().to_string(),
        role: role.as_str().to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Extracts the token from an `Authorization: Bearer ...` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Capability;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_resolves_to_actor() {
        let token = create_token(UserId::new(2), Role::Cashier, SECRET, 60).unwrap();
        let actor = validate_token(&token, SECRET).unwrap().actor().unwrap();

        assert_eq!(actor.user_id, UserId::new(2));
        assert!(actor.can(Capability::ApplyPayment));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(UserId::new(2), Role::Cashier, SECRET, 60).unwrap();
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let claims = Claims {
            sub: "9".to_string(),
            role: "janitor".to_string(),
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.actor(), Err(AuthError::UnknownRole(_))));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(bearer_token(Some("Basic abc")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
        assert!(bearer_token(None).is_err());
    }
}
