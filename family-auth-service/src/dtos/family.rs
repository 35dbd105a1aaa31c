use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Role, UserResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFamilyUserRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "cousin@example.com")]
    pub email: String,

    #[validate(length(max = 200, message = "Full name is too long"))]
    #[schema(example = "Ravi Sharma")]
    pub full_name: Option<String>,

    /// family_user or family_co_admin
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FamilyUsersResponse {
    pub family_id: Uuid,
    pub users: Vec<UserResponse>,
}
