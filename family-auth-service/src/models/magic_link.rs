//! One-time login token for the deprecated magic-link flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MagicLinkToken {
    pub id: Uuid,
    pub email: String,
    /// SHA-256 hex of the emailed token; the raw token is never stored.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl MagicLinkToken {
    /// Mint a token for `email`. Returns the record and the raw token to send.
    pub fn issue(email: String, ttl_minutes: i64) -> (Self, String) {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let raw = URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let token = Self {
            id: Uuid::new_v4(),
            email,
            token_hash: hash_token(&raw),
            expires_at: now + Duration::minutes(ttl_minutes),
            used: false,
            created_at: now,
        };
        (token, raw)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_usable(&self) -> bool {
        !self.used && !self.is_expired()
    }
}

/// Hash a token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_stores_only_hash() {
        let (token, raw) = MagicLinkToken::issue("a@x.com".to_string(), 15);
        assert_ne!(token.token_hash, raw);
        assert_eq!(token.token_hash, hash_token(&raw));
        assert!(token.is_usable());
    }

    #[test]
    fn test_expired_token_is_unusable() {
        let (token, _) = MagicLinkToken::issue("a@x.com".to_string(), -1);
        assert!(token.is_expired());
        assert!(!token.is_usable());
    }
}
