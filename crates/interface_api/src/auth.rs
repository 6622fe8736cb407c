//! Authentication and authorization

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (operator ID)
    pub sub: String,
    /// Granted permissions
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// Creates a new JWT token
pub fn create_token(
    user_id: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        roles,
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

/// Checks if the claims grant a permission
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims.roles.iter().any(|r| r == required_role || r == "admin")
}

/// Fails with [`AuthError::MissingPermission`] unless the permission is granted
pub fn require(claims: &Claims, permission: &str) -> Result<(), AuthError> {
    if has_role(claims, permission) {
        Ok(())
    } else {
        Err(AuthError::MissingPermission(permission.to_string()))
    }
}

/// Permission definitions
pub mod permissions {
    /// Run batch discovery and batch steps
    pub const SYNC_BATCH: &str = "sync:batch";
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-length";

    #[test]
    fn test_token_round_trip_keeps_roles() {
        let token = create_token("operator-1", vec![permissions::SYNC_BATCH.to_string()], SECRET, 300).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "operator-1");
        assert!(require(&claims, permissions::SYNC_BATCH).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_token("operator-1", vec![], SECRET, 300).unwrap();
        assert!(matches!(
            validate_token(&token, "another-secret-entirely"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_admin_has_every_permission() {
        let claims = Claims {
            sub: "root".to_string(),
            roles: vec!["admin".to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(has_role(&claims, permissions::SYNC_BATCH));
    }

    #[test]
    fn test_missing_permission() {
        let claims = Claims {
            sub: "viewer".to_string(),
            roles: vec!["catalog:read".to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(matches!(
            require(&claims, permissions::SYNC_BATCH),
            Err(AuthError::MissingPermission(p)) if p == "sync:batch"
        ));
    }
}
