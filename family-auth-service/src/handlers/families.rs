use service_core::{
    axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};
use uuid::Uuid;

use crate::{
    dtos::family::{CreateFamilyUserRequest, FamilyUsersResponse},
    middleware::SessionContext,
    models::{FamilyResponse, Role, Session, UserResponse},
    services::{require, Denial},
    utils::ValidatedJson,
    AppState,
};

const MANAGERS: &[Role] = &[Role::FamilyAdmin];
const MEMBERS: &[Role] = &[Role::FamilyAdmin, Role::FamilyCoAdmin, Role::FamilyUser];

/// Run the gate for `family_id`. The role check happens before the id is
/// parsed, so an unauthenticated caller always sees 401.
fn gate_family<'a>(
    ctx: &'a SessionContext,
    allowed: &[Role],
    family_id: &str,
) -> Result<(&'a Session, Uuid), AppError> {
    require(ctx.session(), allowed, None)?;
    let family_id =
        Uuid::parse_str(family_id.trim()).map_err(|_| AppError::from(Denial::FamilyMismatch))?;
    let session = require(ctx.session(), allowed, Some(family_id))?;
    Ok((session, family_id))
}

/// Add a member or co-admin to the caller's family
#[utoipa::path(
    post,
    path = "/families/{family_id}/users",
    params(("family_id" = String, Path, description = "Family id")),
    request_body = CreateFamilyUserRequest,
    responses(
        (status = 201, description = "Credential created", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the admin of this family", body = ErrorResponse),
        (status = 409, description = "User already exists in this family", body = ErrorResponse)
    ),
    tag = "Families",
    security(("bearer_auth" = []))
)]
pub async fn create_family_user(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(family_id): Path<String>,
    body: Result<ValidatedJson<CreateFamilyUserRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let (admin, family_id) = gate_family(&ctx, MANAGERS, &family_id)?;
    let ValidatedJson(req) = body?;

    let credential = state
        .families
        .add_member(family_id, &req.email, req.full_name, req.role)
        .await?;

    tracing::debug!(added_by = %admin.user_id, user_id = %credential.id, "Family credential created");

    Ok((StatusCode::CREATED, Json(credential.sanitized())))
}

/// Credentials of a family, oldest first
#[utoipa::path(
    get,
    path = "/families/{family_id}/users",
    params(("family_id" = String, Path, description = "Family id")),
    responses(
        (status = 200, description = "Family credentials", body = FamilyUsersResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not a member of this family", body = ErrorResponse)
    ),
    tag = "Families",
    security(("bearer_auth" = []))
)]
pub async fn list_family_users(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(family_id): Path<String>,
) -> Result<Json<FamilyUsersResponse>, AppError> {
    let (_, family_id) = gate_family(&ctx, MEMBERS, &family_id)?;

    let users = state
        .families
        .list_members(family_id)
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(FamilyUsersResponse { family_id, users }))
}

/// Summary of a family
#[utoipa::path(
    get,
    path = "/families/{family_id}",
    params(("family_id" = String, Path, description = "Family id")),
    responses(
        (status = 200, description = "Family summary", body = FamilyResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not a member of this family", body = ErrorResponse)
    ),
    tag = "Families",
    security(("bearer_auth" = []))
)]
pub async fn get_family(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(family_id): Path<String>,
) -> Result<Json<FamilyResponse>, AppError> {
    let (_, family_id) = gate_family(&ctx, MEMBERS, &family_id)?;
    let family = state.families.get_family(family_id).await?;
    Ok(Json(family.view()))
}
