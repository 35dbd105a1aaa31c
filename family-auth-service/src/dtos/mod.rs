pub mod auth;
pub mod family;
pub mod onboarding;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body written by `AppError`'s `IntoResponse`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "authentication_error")]
    pub kind: String,
    #[schema(example = "Invalid credentials")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
