//! Persistence boundary for credentials, families and onboarding requests.
//!
//! Implementations must make [`CredentialStore::approve_onboarding_request`]
//! and [`CredentialStore::reject_onboarding_request`] compare-and-set
//! operations: the status check and the write happen as one atomic unit, so
//! concurrent decisions on the same request have exactly one winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    FamilyScope, MagicLinkToken, OnboardingRequest, RequestStatus, UserCredential,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a pending request already exists for this email")]
    DuplicatePendingEmail,

    #[error("family name already taken")]
    DuplicateFamilyName,

    #[error("credential already exists")]
    DuplicateCredential,

    #[error("onboarding request not found")]
    RequestNotFound,

    #[error("onboarding request is {0}")]
    NotPending(RequestStatus),

    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Everything an approval provisions, returned as one unit.
#[derive(Debug, Clone)]
pub struct Approval {
    pub request: OnboardingRequest,
    pub family: FamilyScope,
    pub admin: UserCredential,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    // ==================== Onboarding Requests ====================

    /// Insert a pending request, enforcing one pending request per email and
    /// family-name uniqueness across non-rejected requests and families.
    async fn insert_onboarding_request(&self, request: &OnboardingRequest)
        -> Result<(), StoreError>;

    async fn find_onboarding_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<OnboardingRequest>, StoreError>;

    async fn find_pending_request_by_email(
        &self,
        email: &str,
    ) -> Result<Option<OnboardingRequest>, StoreError>;

    /// Requests ordered by `requested_at` ascending, optionally filtered.
    async fn list_onboarding_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<OnboardingRequest>, StoreError>;

    /// pending -> approved, creating the family scope and its family_admin
    /// credential in the same atomic unit.
    async fn approve_onboarding_request(
        &self,
        request_id: Uuid,
        reviewed_by: Option<Uuid>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Approval, StoreError>;

    /// pending -> rejected.
    async fn reject_onboarding_request(
        &self,
        request_id: Uuid,
        reason: &str,
        reviewed_by: Option<Uuid>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<OnboardingRequest, StoreError>;

    // ==================== Families ====================

    async fn find_family(&self, family_id: Uuid) -> Result<Option<FamilyScope>, StoreError>;

    async fn find_family_by_name(&self, family_name: &str)
        -> Result<Option<FamilyScope>, StoreError>;

    // ==================== Credentials ====================

    /// Insert a credential; `(email, family_id)` must be unique.
    async fn insert_credential(&self, credential: &UserCredential) -> Result<(), StoreError>;

    async fn find_credential(&self, user_id: Uuid) -> Result<Option<UserCredential>, StoreError>;

    async fn find_family_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredential>, StoreError>;

    async fn find_credential_in_family(
        &self,
        family_id: Uuid,
        email: &str,
    ) -> Result<Option<UserCredential>, StoreError>;

    /// Family-scoped credentials for an email across all families.
    async fn find_family_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<UserCredential>, StoreError>;

    /// Credentials of one family ordered by `created_at`.
    async fn list_family_credentials(
        &self,
        family_id: Uuid,
    ) -> Result<Vec<UserCredential>, StoreError>;

    /// Insert the super admin unless one with the same email exists; returns
    /// the stored record either way.
    async fn ensure_super_admin(
        &self,
        credential: &UserCredential,
    ) -> Result<UserCredential, StoreError>;

    // ==================== Magic Links ====================

    async fn insert_magic_link(&self, token: &MagicLinkToken) -> Result<(), StoreError>;

    /// Atomically mark the matching unused, unexpired token as used.
    /// Returns whether a token was consumed.
    async fn consume_magic_link(&self, email: &str, token_hash: &str) -> Result<bool, StoreError>;
}
