use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SuperAdminLoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    #[schema(example = "root")]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    #[schema(example = "admin@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MemberLoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    #[schema(example = "member@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Family name is required"))]
    #[schema(example = "The_Sharmas")]
    pub family_name: String,

    #[validate(length(min = 1, message = "Family password is required"))]
    #[schema(example = "fam1")]
    pub family_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MagicLinkRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    #[schema(example = "member@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MagicLinkVerifyRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    #[schema(example = "member@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Token is required"))]
    #[schema(example = "kq3V0m1bX0Jm2yB9sGQy1tZk5w2cH1qK3hX8d1Yp0aQ")]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyTokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9...")]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Logged out")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
