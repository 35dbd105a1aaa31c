//! Family scope model - the tenant boundary every non-super-admin lives in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::PasswordHashString;

#[derive(Debug, Clone)]
pub struct FamilyScope {
    pub id: Uuid,
    pub family_name: String,
    /// Shared password members and co-admins log in with.
    pub family_password_hash: PasswordHashString,
    pub admin_user_id: Uuid,
    pub source_request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl FamilyScope {
    pub fn new(
        family_name: String,
        family_password_hash: PasswordHashString,
        admin_user_id: Uuid,
        source_request_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            family_name,
            family_password_hash,
            admin_user_id,
            source_request_id,
            created_at: Utc::now(),
        }
    }

    pub fn view(&self) -> FamilyResponse {
        FamilyResponse {
            family_id: self.id,
            family_name: self.family_name.clone(),
            admin_user_id: self.admin_user_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FamilyResponse {
    pub family_id: Uuid,
    pub family_name: String,
    pub admin_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
