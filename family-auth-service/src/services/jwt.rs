use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::{Role, Session};

/// JWT service for session token issue and verification (HS256).
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (credential id)
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Absent for super_admin
    pub family_id: Option<Uuid>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID (for revocation)
    pub jti: String,
}

impl AccessTokenClaims {
    /// Family roles carry exactly one family id and super_admin carries none.
    fn into_session(self) -> Result<Session, anyhow::Error> {
        if self.role.is_family_scoped() != self.family_id.is_some() {
            return Err(anyhow::anyhow!(
                "Role {} does not match token family scope",
                self.role
            ));
        }

        Ok(Session {
            token_id: self.jti,
            user_id: self.sub,
            email: self.email,
            role: self.role,
            family_id: self.family_id,
            issued_at: timestamp(self.iat)?,
            expires_at: timestamp(self.exp)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, anyhow::Error> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("Invalid token timestamp: {}", secs))
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(anyhow::anyhow!("JWT secret must not be empty"));
        }

        tracing::info!("JWT service initialized with HS256 secret");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
        })
    }

    /// Sign a session token for one credential. Returns the token and the
    /// session it encodes.
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        family_id: Option<Uuid>,
    ) -> Result<(String, Session), anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id,
            email: email.to_string(),
            role,
            family_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;

        Ok((token, claims.into_session()?))
    }

    /// Check signature and expiry, returning the session the token encodes.
    pub fn verify(&self, token: &str) -> Result<Session, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        token_data.claims.into_session()
    }

    /// Get access token expiry in seconds (for client info)
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}
