//! User credential model - one login identity bound to a role and family.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Role;
use crate::utils::PasswordHashString;

/// Credential entity.
///
/// `password_hash` is set for super_admin and family_admin. Co-admins and
/// users authenticate with the shared password held on their family.
#[derive(Debug, Clone)]
pub struct UserCredential {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub family_id: Option<Uuid>,
    pub password_hash: Option<PasswordHashString>,
    pub created_at: DateTime<Utc>,
}

impl UserCredential {
    /// Family admin provisioned from an approved onboarding request.
    pub fn new_family_admin(
        email: String,
        full_name: String,
        family_id: Uuid,
        password_hash: PasswordHashString,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name: Some(full_name),
            role: Role::FamilyAdmin,
            family_id: Some(family_id),
            password_hash: Some(password_hash),
            created_at: Utc::now(),
        }
    }

    /// Member or co-admin added by a family admin.
    pub fn new_family_member(
        email: String,
        full_name: Option<String>,
        role: Role,
        family_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            role,
            family_id: Some(family_id),
            password_hash: None,
            created_at: Utc::now(),
        }
    }

    /// Out-of-band provisioned super admin.
    pub fn new_super_admin(email: String, password_hash: PasswordHashString) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name: Some("Super Admin".to_string()),
            role: Role::SuperAdmin,
            family_id: None,
            password_hash: Some(password_hash),
            created_at: Utc::now(),
        }
    }

    /// Convert to sanitized response (no sensitive fields).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self)
    }
}

/// Credential as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: Role,
    pub family_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserCredential> for UserResponse {
    fn from(u: &UserCredential) -> Self {
        Self {
            user_id: u.id,
            email: u.email.clone(),
            full_name: u.full_name.clone(),
            role: u.role,
            family_id: u.family_id,
            created_at: u.created_at,
        }
    }
}
