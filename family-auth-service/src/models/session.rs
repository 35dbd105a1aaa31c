//! Session model - the verified contents of a bearer token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Role;

/// An authenticated caller. Immutable; built only by verifying a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token_id: String,
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub family_id: Option<Uuid>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role,
            family_id: self.family_id,
        }
    }
}

/// Identity summary returned with every issued session and by token checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub family_id: Option<Uuid>,
}
