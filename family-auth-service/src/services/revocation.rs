use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Revoked session token ids, each kept until the token would have expired.
#[async_trait]
pub trait TokenRevocationList: Send + Sync {
    async fn revoke(&self, token_jti: &str, expires_at: DateTime<Utc>)
        -> Result<(), anyhow::Error>;
    async fn is_revoked(&self, token_jti: &str) -> Result<bool, anyhow::Error>;
}

/// Process-local revocation list.
///
/// Entries whose token has expired are pruned on every revoke; an expired
/// token fails signature validation anyway, so dropping it loses nothing.
#[derive(Default)]
pub struct InMemoryRevocationList {
    revoked: DashMap<String, DateTime<Utc>>,
}

impl InMemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }

    fn prune(&self, now: DateTime<Utc>) {
        self.revoked.retain(|_, expires_at| *expires_at > now);
    }
}

#[async_trait]
impl TokenRevocationList for InMemoryRevocationList {
    async fn revoke(
        &self,
        token_jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        let now = Utc::now();
        self.prune(now);
        if expires_at > now {
            self.revoked.insert(token_jti.to_string(), expires_at);
        }
        Ok(())
    }

    async fn is_revoked(&self, token_jti: &str) -> Result<bool, anyhow::Error> {
        Ok(self
            .revoked
            .get(token_jti)
            .map(|expires_at| *expires_at > Utc::now())
            .unwrap_or(false))
    }
}
