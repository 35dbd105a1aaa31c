use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{OnboardingRequestView, RequestStatus, UserResponse};

/// Registration form of a prospective family admin.
///
/// Field rules are checked by the request ledger in a fixed order, so the
/// extractor only enforces well-formed JSON. Missing fields deserialize as
/// empty strings and fail the "All fields are required" rule.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct AdminRegisterRequest {
    #[schema(example = "admin@example.com")]
    pub email: String,
    #[schema(example = "Priya Sharma")]
    pub full_name: String,
    #[schema(example = "The_Sharmas")]
    pub family_name: String,
    #[schema(example = "password123", min_length = 8)]
    pub password: String,
    #[schema(example = "password123")]
    pub confirm_password: String,
    #[schema(example = "fam1", min_length = 4)]
    pub family_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminRegisterResponse {
    pub request_id: Uuid,
    pub status: RequestStatus,
    #[schema(example = "Your request has been submitted and is awaiting SuperAdmin approval.")]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestListResponse {
    pub requests: Vec<OnboardingRequestView>,
    pub total: usize,
}

impl From<Vec<OnboardingRequestView>> for RequestListResponse {
    fn from(requests: Vec<OnboardingRequestView>) -> Self {
        Self {
            total: requests.len(),
            requests,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApproveRequest {
    pub request_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApproveResponse {
    #[schema(example = "Request approved")]
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectRequest {
    pub request_id: Uuid,
    /// Blank reasons are rejected by the ledger before any state change.
    #[serde(default)]
    #[schema(example = "Family name is offensive")]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RejectResponse {
    #[schema(example = "Request rejected")]
    pub message: String,
    pub request: OnboardingRequestView,
}
