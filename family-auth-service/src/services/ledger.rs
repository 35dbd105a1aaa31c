//! Onboarding request lifecycle: submit, review, and status lookups.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::dtos::onboarding::AdminRegisterRequest;
use crate::models::{OnboardingRequest, RequestStatus, UserCredential};
use crate::services::metrics::record_onboarding;
use crate::services::notifier::{notify_best_effort, Notification, Notifier};
use crate::services::{CredentialStore, ServiceError};
use crate::utils::{hash_password, is_valid_family_name, normalize_email, Password};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_FAMILY_PASSWORD_LEN: usize = 4;

#[derive(Clone)]
pub struct RequestLedger {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
}

/// Field rules in precedence order; the first failure is reported.
fn validate_submission(req: &AdminRegisterRequest) -> Result<(), ServiceError> {
    let fields = [
        &req.email,
        &req.full_name,
        &req.family_name,
        &req.password,
        &req.confirm_password,
        &req.family_password,
    ];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ServiceError::Validation("All fields are required".to_string()));
    }

    if Password::new(req.password.as_str()).char_len() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if req.password != req.confirm_password {
        return Err(ServiceError::Validation("Passwords do not match".to_string()));
    }

    if Password::new(req.family_password.as_str()).char_len() < MIN_FAMILY_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "Family password must be at least {} characters long",
            MIN_FAMILY_PASSWORD_LEN
        )));
    }

    if !is_valid_family_name(req.family_name.trim()) {
        return Err(ServiceError::Validation(
            "Family name may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }

    if !normalize_email(&req.email).validate_email() {
        return Err(ServiceError::Validation("Invalid email format".to_string()));
    }

    Ok(())
}

impl RequestLedger {
    pub fn new(store: Arc<dyn CredentialStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn submit(&self, req: AdminRegisterRequest) -> Result<OnboardingRequest, ServiceError> {
        if let Err(e) = validate_submission(&req) {
            record_onboarding("invalid");
            return Err(e);
        }

        let email = normalize_email(&req.email);
        let family_name = req.family_name.trim().to_string();

        if self.store.find_pending_request_by_email(&email).await?.is_some() {
            record_onboarding("conflict");
            return Err(ServiceError::Conflict(
                "A request is already pending for this email".to_string(),
            ));
        }

        if self.store.find_family_admin_by_email(&email).await?.is_some() {
            record_onboarding("conflict");
            return Err(ServiceError::Conflict(
                "This email already administers a family".to_string(),
            ));
        }

        if self.store.find_family_by_name(&family_name).await?.is_some() {
            record_onboarding("conflict");
            return Err(ServiceError::Conflict("Family name already exists".to_string()));
        }

        let password_hash = hash_password(&Password::new(req.password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;
        let family_password_hash =
            hash_password(&Password::new(req.family_password)).map_err(|e| {
                ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
            })?;

        let request = OnboardingRequest::new(
            email,
            req.full_name.trim().to_string(),
            family_name,
            password_hash,
            family_password_hash,
        );

        // Pending-email and family-name uniqueness are enforced again here,
        // atomically, for submissions that raced past the reads above.
        if let Err(e) = self.store.insert_onboarding_request(&request).await {
            record_onboarding("conflict");
            return Err(e.into());
        }

        tracing::info!(request_id = %request.id, family_name = %request.family_name, "Onboarding request submitted");
        record_onboarding("submitted");

        notify_best_effort(
            self.notifier.as_ref(),
            Notification::RequestReceived {
                email: request.email.clone(),
                full_name: request.full_name.clone(),
                family_name: request.family_name.clone(),
                request_id: request.id,
            },
        )
        .await;

        Ok(request)
    }

    pub async fn get_status(&self, request_id: Uuid) -> Result<OnboardingRequest, ServiceError> {
        self.store
            .find_onboarding_request(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound)
    }

    pub async fn list_all(&self) -> Result<Vec<OnboardingRequest>, ServiceError> {
        Ok(self.store.list_onboarding_requests(None).await?)
    }

    pub async fn list_pending(&self) -> Result<Vec<OnboardingRequest>, ServiceError> {
        Ok(self
            .store
            .list_onboarding_requests(Some(RequestStatus::Pending))
            .await?)
    }

    /// Approve a pending request, provisioning its family and family admin.
    /// Does not issue a session.
    pub async fn approve(
        &self,
        request_id: Uuid,
        reviewer: Option<Uuid>,
    ) -> Result<UserCredential, ServiceError> {
        let approval = self
            .store
            .approve_onboarding_request(request_id, reviewer, Utc::now())
            .await?;

        tracing::info!(
            request_id = %request_id,
            family_id = %approval.family.id,
            user_id = %approval.admin.id,
            "Onboarding request approved"
        );
        record_onboarding("approved");

        notify_best_effort(
            self.notifier.as_ref(),
            Notification::RequestApproved {
                email: approval.admin.email.clone(),
                family_name: approval.family.family_name.clone(),
            },
        )
        .await;

        Ok(approval.admin)
    }

    pub async fn reject(
        &self,
        request_id: Uuid,
        reason: &str,
        reviewer: Option<Uuid>,
    ) -> Result<OnboardingRequest, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::Validation(
                "Rejection reason is required".to_string(),
            ));
        }

        let request = self
            .store
            .reject_onboarding_request(request_id, reason, reviewer, Utc::now())
            .await?;

        tracing::info!(request_id = %request_id, "Onboarding request rejected");
        record_onboarding("rejected");

        notify_best_effort(
            self.notifier.as_ref(),
            Notification::RequestRejected {
                email: request.email.clone(),
                family_name: request.family_name.clone(),
                reason: reason.to_string(),
            },
        )
        .await;

        Ok(request)
    }
}
