use std::sync::Arc;
use uuid::Uuid;

use crate::models::{FamilyScope, Role, UserCredential};
use crate::services::{CredentialStore, ServiceError};
use crate::utils::normalize_email;

/// Family-scoped credential administration. Callers pass the Access Gate
/// before reaching here.
#[derive(Clone)]
pub struct FamilyDirectory {
    store: Arc<dyn CredentialStore>,
}

impl FamilyDirectory {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn get_family(&self, family_id: Uuid) -> Result<FamilyScope, ServiceError> {
        self.store
            .find_family(family_id)
            .await?
            .ok_or(ServiceError::FamilyNotFound)
    }

    /// Add a member or co-admin. They sign in with the family's shared
    /// password, so no personal secret is created.
    pub async fn add_member(
        &self,
        family_id: Uuid,
        email: &str,
        full_name: Option<String>,
        role: Role,
    ) -> Result<UserCredential, ServiceError> {
        if !matches!(role, Role::FamilyUser | Role::FamilyCoAdmin) {
            return Err(ServiceError::Validation(
                "Role must be family_user or family_co_admin".to_string(),
            ));
        }

        let family = self.get_family(family_id).await?;
        let email = normalize_email(email);

        if self
            .store
            .find_credential_in_family(family.id, &email)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "User already exists in this family".to_string(),
            ));
        }

        let full_name = full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let credential = UserCredential::new_family_member(email, full_name, role, family.id);
        self.store.insert_credential(&credential).await?;

        tracing::info!(
            family_id = %family.id,
            user_id = %credential.id,
            role = %role,
            "Family member added"
        );

        Ok(credential)
    }

    pub async fn list_members(&self, family_id: Uuid) -> Result<Vec<UserCredential>, ServiceError> {
        let family = self.get_family(family_id).await?;
        Ok(self.store.list_family_credentials(family.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;
    use crate::utils::{hash_password, Password};

    async fn seeded() -> (FamilyDirectory, FamilyScope) {
        let store = Arc::new(InMemoryStore::new());
        let hash = hash_password(&Password::new("fam1")).unwrap();
        let request = crate::models::OnboardingRequest::new(
            "admin@x.com".to_string(),
            "Admin".to_string(),
            "Sharma".to_string(),
            hash.clone(),
            hash,
        );
        store.insert_onboarding_request(&request).await.unwrap();
        let approval = store
            .approve_onboarding_request(request.id, None, chrono::Utc::now())
            .await
            .unwrap();
        (FamilyDirectory::new(store), approval.family)
    }

    #[tokio::test]
    async fn test_add_and_list_members() {
        let (directory, family) = seeded().await;

        let member = directory
            .add_member(family.id, "Cousin@X.com", Some(" Ravi ".to_string()), Role::FamilyUser)
            .await
            .unwrap();
        assert_eq!(member.email, "cousin@x.com");
        assert_eq!(member.full_name.as_deref(), Some("Ravi"));
        assert!(member.password_hash.is_none());

        let members = directory.list_members(family.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].role, Role::FamilyAdmin);
    }

    #[tokio::test]
    async fn test_duplicate_member_conflicts() {
        let (directory, family) = seeded().await;
        assert!(matches!(
            directory
                .add_member(family.id, "admin@x.com", None, Role::FamilyUser)
                .await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_roles_cannot_be_granted() {
        let (directory, family) = seeded().await;
        for role in [Role::FamilyAdmin, Role::SuperAdmin] {
            assert!(matches!(
                directory.add_member(family.id, "x@x.com", None, role).await,
                Err(ServiceError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_family() {
        let (directory, _) = seeded().await;
        assert!(matches!(
            directory.list_members(Uuid::new_v4()).await,
            Err(ServiceError::FamilyNotFound)
        ));
    }
}
