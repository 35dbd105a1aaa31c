use service_core::error::AppError;
use thiserror::Error;

use crate::models::RequestStatus;
use crate::services::store::StoreError;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_MEMBER_CREDENTIALS: &str = "Invalid credentials or not a member of this family";
pub const PENDING_APPROVAL: &str =
    "Admin request is still pending SuperAdmin approval. Please check back later.";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Request not found")]
    RequestNotFound,

    #[error("Family not found")]
    FamilyNotFound,

    #[error("Request is not pending (status: {0})")]
    InvalidState(RequestStatus),

    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,

    #[error("{}", INVALID_MEMBER_CREDENTIALS)]
    InvalidMemberCredentials,

    #[error("{}", PENDING_APPROVAL)]
    PendingApproval,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Magic link login is disabled")]
    MagicLinkDisabled,

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePendingEmail => {
                ServiceError::Conflict("A request is already pending for this email".to_string())
            }
            StoreError::DuplicateFamilyName => {
                ServiceError::Conflict("Family name already exists".to_string())
            }
            StoreError::DuplicateCredential => {
                ServiceError::Conflict("User already exists in this family".to_string())
            }
            StoreError::RequestNotFound => ServiceError::RequestNotFound,
            StoreError::NotPending(status) => ServiceError::InvalidState(status),
            StoreError::Backend(e) => ServiceError::Database(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            e @ (ServiceError::RequestNotFound | ServiceError::FamilyNotFound) => {
                AppError::NotFound(anyhow::anyhow!(e.to_string()))
            }
            e @ ServiceError::InvalidState(_) => AppError::InvalidState(anyhow::anyhow!(e.to_string())),
            e @ (ServiceError::InvalidCredentials
            | ServiceError::InvalidMemberCredentials
            | ServiceError::InvalidToken) => AppError::AuthError(anyhow::anyhow!(e.to_string())),
            ServiceError::PendingApproval => {
                AppError::PendingApproval(anyhow::anyhow!(PENDING_APPROVAL))
            }
            ServiceError::MagicLinkDisabled => AppError::NotFound(anyhow::anyhow!("Not found")),
            ServiceError::Database(e) => AppError::DatabaseError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
