use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    FamilyScope, MagicLinkToken, OnboardingRequest, RequestStatus, Role, UserCredential,
};
use crate::services::store::{Approval, CredentialStore, StoreError};

#[derive(Default)]
struct Tables {
    /// Insertion order is kept so equal timestamps list stably.
    requests: Vec<OnboardingRequest>,
    families: HashMap<Uuid, FamilyScope>,
    credentials: Vec<UserCredential>,
    magic_links: Vec<MagicLinkToken>,
}

impl Tables {
    fn request_mut(&mut self, request_id: Uuid) -> Result<&mut OnboardingRequest, StoreError> {
        self.requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or(StoreError::RequestNotFound)
    }

    fn family_name_taken(&self, family_name: &str) -> bool {
        self.requests
            .iter()
            .any(|r| r.status != RequestStatus::Rejected && r.family_name == family_name)
            || self.families.values().any(|f| f.family_name == family_name)
    }

    fn credential_exists(&self, email: &str, family_id: Option<Uuid>) -> bool {
        self.credentials
            .iter()
            .any(|c| c.email == email && c.family_id == family_id)
    }
}

/// Process-local store. Every operation holds a single lock, which makes each
/// trait method atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Backend(anyhow::anyhow!("In-memory store mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn insert_onboarding_request(
        &self,
        request: &OnboardingRequest,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables
            .requests
            .iter()
            .any(|r| r.is_pending() && r.email == request.email)
        {
            return Err(StoreError::DuplicatePendingEmail);
        }
        if tables.family_name_taken(&request.family_name) {
            return Err(StoreError::DuplicateFamilyName);
        }
        tables.requests.push(request.clone());
        Ok(())
    }

    async fn find_onboarding_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<OnboardingRequest>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.requests.iter().find(|r| r.id == request_id).cloned())
    }

    async fn find_pending_request_by_email(
        &self,
        email: &str,
    ) -> Result<Option<OnboardingRequest>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .requests
            .iter()
            .find(|r| r.is_pending() && r.email == email)
            .cloned())
    }

    async fn list_onboarding_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<OnboardingRequest>, StoreError> {
        let tables = self.lock()?;
        let mut requests: Vec<OnboardingRequest> = tables
            .requests
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.requested_at);
        Ok(requests)
    }

    async fn approve_onboarding_request(
        &self,
        request_id: Uuid,
        reviewed_by: Option<Uuid>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Approval, StoreError> {
        let mut tables = self.lock()?;

        let request = tables.request_mut(request_id)?;
        if !request.is_pending() {
            return Err(StoreError::NotPending(request.status));
        }
        let snapshot = request.clone();

        if tables
            .credentials
            .iter()
            .any(|c| c.role == Role::FamilyAdmin && c.email == snapshot.email)
        {
            return Err(StoreError::DuplicateCredential);
        }
        if tables
            .families
            .values()
            .any(|f| f.family_name == snapshot.family_name)
        {
            return Err(StoreError::DuplicateFamilyName);
        }

        let admin_id = Uuid::new_v4();
        let family = FamilyScope::new(
            snapshot.family_name.clone(),
            snapshot.family_password_hash.clone(),
            admin_id,
            Some(snapshot.id),
        );
        let mut admin = UserCredential::new_family_admin(
            snapshot.email.clone(),
            snapshot.full_name.clone(),
            family.id,
            snapshot.password_hash.clone(),
        );
        admin.id = admin_id;

        let request = tables.request_mut(request_id)?;
        request.status = RequestStatus::Approved;
        request.reviewed_at = Some(reviewed_at);
        request.reviewed_by = reviewed_by;
        let request = request.clone();

        tables.families.insert(family.id, family.clone());
        tables.credentials.push(admin.clone());

        Ok(Approval {
            request,
            family,
            admin,
        })
    }

    async fn reject_onboarding_request(
        &self,
        request_id: Uuid,
        reason: &str,
        reviewed_by: Option<Uuid>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<OnboardingRequest, StoreError> {
        let mut tables = self.lock()?;
        let request = tables.request_mut(request_id)?;
        if !request.is_pending() {
            return Err(StoreError::NotPending(request.status));
        }
        request.status = RequestStatus::Rejected;
        request.rejection_reason = Some(reason.to_string());
        request.reviewed_at = Some(reviewed_at);
        request.reviewed_by = reviewed_by;
        Ok(request.clone())
    }

    async fn find_family(&self, family_id: Uuid) -> Result<Option<FamilyScope>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.families.get(&family_id).cloned())
    }

    async fn find_family_by_name(
        &self,
        family_name: &str,
    ) -> Result<Option<FamilyScope>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .families
            .values()
            .find(|f| f.family_name == family_name)
            .cloned())
    }

    async fn insert_credential(&self, credential: &UserCredential) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.credential_exists(&credential.email, credential.family_id) {
            return Err(StoreError::DuplicateCredential);
        }
        if credential.role == Role::FamilyAdmin
            && tables
                .credentials
                .iter()
                .any(|c| c.role == Role::FamilyAdmin && c.email == credential.email)
        {
            return Err(StoreError::DuplicateCredential);
        }
        tables.credentials.push(credential.clone());
        Ok(())
    }

    async fn find_credential(&self, user_id: Uuid) -> Result<Option<UserCredential>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.credentials.iter().find(|c| c.id == user_id).cloned())
    }

    async fn find_family_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .credentials
            .iter()
            .find(|c| c.role == Role::FamilyAdmin && c.email == email)
            .cloned())
    }

    async fn find_credential_in_family(
        &self,
        family_id: Uuid,
        email: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .credentials
            .iter()
            .find(|c| c.family_id == Some(family_id) && c.email == email)
            .cloned())
    }

    async fn find_family_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<UserCredential>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .credentials
            .iter()
            .filter(|c| c.family_id.is_some() && c.email == email)
            .cloned()
            .collect())
    }

    async fn list_family_credentials(
        &self,
        family_id: Uuid,
    ) -> Result<Vec<UserCredential>, StoreError> {
        let tables = self.lock()?;
        let mut members: Vec<UserCredential> = tables
            .credentials
            .iter()
            .filter(|c| c.family_id == Some(family_id))
            .cloned()
            .collect();
        members.sort_by_key(|c| c.created_at);
        Ok(members)
    }

    async fn ensure_super_admin(
        &self,
        credential: &UserCredential,
    ) -> Result<UserCredential, StoreError> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables
            .credentials
            .iter_mut()
            .find(|c| c.role == Role::SuperAdmin && c.email == credential.email)
        {
            existing.password_hash = credential.password_hash.clone();
            return Ok(existing.clone());
        }
        tables.credentials.push(credential.clone());
        Ok(credential.clone())
    }

    async fn insert_magic_link(&self, token: &MagicLinkToken) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.magic_links.push(token.clone());
        Ok(())
    }

    async fn consume_magic_link(&self, email: &str, token_hash: &str) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        match tables
            .magic_links
            .iter_mut()
            .find(|t| t.email == email && t.token_hash == token_hash && t.is_usable())
        {
            Some(token) => {
                token.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{hash_password, Password};

    fn request(email: &str, family: &str) -> OnboardingRequest {
        let hash = hash_password(&Password::new("password123")).unwrap();
        let family_hash = hash_password(&Password::new("fam1")).unwrap();
        OnboardingRequest::new(
            email.to_string(),
            "Test User".to_string(),
            family.to_string(),
            hash,
            family_hash,
        )
    }

    #[tokio::test]
    async fn test_second_pending_request_for_email_conflicts() {
        let store = InMemoryStore::new();
        store
            .insert_onboarding_request(&request("a@x.com", "Smith"))
            .await
            .unwrap();

        let err = store
            .insert_onboarding_request(&request("a@x.com", "Jones"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePendingEmail));
    }

    #[tokio::test]
    async fn test_rejected_request_releases_family_name() {
        let store = InMemoryStore::new();
        let first = request("a@x.com", "Smith");
        store.insert_onboarding_request(&first).await.unwrap();
        store
            .reject_onboarding_request(first.id, "no", None, Utc::now())
            .await
            .unwrap();

        store
            .insert_onboarding_request(&request("b@x.com", "Smith"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_approve_provisions_family_and_admin() {
        let store = InMemoryStore::new();
        let req = request("a@x.com", "Smith");
        store.insert_onboarding_request(&req).await.unwrap();

        let approval = store
            .approve_onboarding_request(req.id, None, Utc::now())
            .await
            .unwrap();

        assert_eq!(approval.request.status, RequestStatus::Approved);
        assert_eq!(approval.family.admin_user_id, approval.admin.id);
        assert_eq!(approval.admin.family_id, Some(approval.family.id));
        assert_eq!(approval.admin.role, Role::FamilyAdmin);

        let err = store
            .reject_onboarding_request(req.id, "late", None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotPending(RequestStatus::Approved)));
    }

    #[tokio::test]
    async fn test_magic_link_consumed_once() {
        let store = InMemoryStore::new();
        let (token, _raw) = MagicLinkToken::issue("a@x.com".to_string(), 15);
        store.insert_magic_link(&token).await.unwrap();

        assert!(store.consume_magic_link("a@x.com", &token.token_hash).await.unwrap());
        assert!(!store.consume_magic_link("a@x.com", &token.token_hash).await.unwrap());
    }
}
