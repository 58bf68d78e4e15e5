use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::models::User;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Claims carried inside an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    /// Subscription level at issue time
    pub level: String,
    pub iat: i64,
    pub exp: i64,
}

/// Hash a password with Argon2id and a fresh random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Message(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
///
/// Returns `Ok(false)` on mismatch; an error only signals a malformed
/// stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Message(format!("Stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Reject passwords that are too weak to accept
pub fn validate_password_strength(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

/// Sign a short-lived access token for a user
///
/// # Arguments
/// * `config` - Auth configuration holding the signing secret and TTL
/// * `user` - The authenticated account
///
/// # Returns
/// The encoded token and its lifetime in seconds
pub fn issue_access_token(config: &AuthConfig, user: &User) -> AppResult<(String, i64)> {
    let now = chrono::Utc::now();
    let ttl = chrono::Duration::minutes(config.access_token_ttl_minutes);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        level: user.subscription_level.clone(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Message(format!("Token signing failed: {}", e)))?;

    Ok((token, ttl.num_seconds()))
}

/// Decode and validate an access token
pub fn verify_access_token(config: &AuthConfig, token: &str) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired access token".to_string()))?;

    Ok(data.claims)
}

/// Generate an opaque token for refresh / reset / verification flows
///
/// 64 hex characters; stored server-side, never decoded.
pub fn generate_opaque_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// SHA-256 hex digest of an API key secret
pub fn hash_api_key(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh API key
///
/// # Returns
/// `(secret, prefix, hash)` - the secret is shown to the user exactly
/// once; only prefix and hash are persisted.
pub fn generate_api_key() -> (String, String, String) {
    let secret = format!(
        "trf_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    let prefix = secret[..8].to_string();
    let hash = hash_api_key(&secret);

    (secret, prefix, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new(
            "rider@example.com".to_string(),
            None,
            "Rider".to_string(),
        )
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2"));

        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("short").is_err());
        assert!(validate_password_strength("long enough").is_ok());
    }

    #[test]
    fn test_access_token_roundtrip() {
        let config = AuthConfig::default();
        let user = test_user();

        let (token, expires_in) = issue_access_token(&config, &user).unwrap();
        assert_eq!(expires_in, config.access_token_ttl_minutes * 60);

        let claims = verify_access_token(&config, &token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.level, "free");
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = AuthConfig::default();
        let user = test_user();

        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            level: user.subscription_level.clone(),
            iat: (now - chrono::Duration::hours(2)).timestamp(),
            exp: (now - chrono::Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_access_token(&config, &token).is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let config = AuthConfig::default();
        let mut other = AuthConfig::default();
        other.jwt_secret = "another-secret-also-32-bytes-long!!".to_string();

        let (token, _) = issue_access_token(&other, &test_user()).unwrap();
        assert!(verify_access_token(&config, &token).is_err());
    }

    #[test]
    fn test_api_key_generation() {
        let (secret, prefix, hash) = generate_api_key();

        assert!(secret.starts_with("trf_"));
        assert!(secret.starts_with(&prefix));
        assert_eq!(prefix.len(), 8);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key(&secret));

        let (secret2, _, hash2) = generate_api_key();
        assert_ne!(secret, secret2);
        assert_ne!(hash, hash2);
    }

    #[test]
    fn test_opaque_tokens_are_unique() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();

        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
