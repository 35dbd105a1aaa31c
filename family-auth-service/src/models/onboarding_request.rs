//! Onboarding request model - a prospective family admin awaiting review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::PasswordHashString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

/// Onboarding request as persisted. Holds password hashes, so it is never
/// serialised directly; use [`OnboardingRequest::view`].
#[derive(Debug, Clone)]
pub struct OnboardingRequest {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub family_name: String,
    pub password_hash: PasswordHashString,
    pub family_password_hash: PasswordHashString,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

impl OnboardingRequest {
    /// Create a new pending request.
    pub fn new(
        email: String,
        full_name: String,
        family_name: String,
        password_hash: PasswordHashString,
        family_password_hash: PasswordHashString,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            family_name,
            password_hash,
            family_password_hash,
            status: RequestStatus::Pending,
            rejection_reason: None,
            requested_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn view(&self) -> OnboardingRequestView {
        OnboardingRequestView::from(self)
    }
}

/// Public projection of an onboarding request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OnboardingRequestView {
    pub request_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub family_name: String,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl From<&OnboardingRequest> for OnboardingRequestView {
    fn from(r: &OnboardingRequest) -> Self {
        Self {
            request_id: r.id,
            email: r.email.clone(),
            full_name: r.full_name.clone(),
            family_name: r.family_name.clone(),
            status: r.status,
            rejection_reason: r.rejection_reason.clone(),
            requested_at: r.requested_at,
            reviewed_at: r.reviewed_at,
        }
    }
}
