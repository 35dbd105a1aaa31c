use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::auth::{
        AdminLoginRequest, MemberLoginRequest, MessageResponse, SuperAdminLoginRequest,
        VerifyTokenRequest,
    },
    middleware::SessionContext,
    models::{Role, UserProfile},
    services::{require, AuthRequest},
    utils::{Password, ValidatedJson},
    AppState,
};

const ANY_ROLE: &[Role] = &[
    Role::SuperAdmin,
    Role::FamilyAdmin,
    Role::FamilyCoAdmin,
    Role::FamilyUser,
];

/// Log in as the configured super admin
#[utoipa::path(
    post,
    path = "/superadmin/login",
    request_body = SuperAdminLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthSession),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn super_admin_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SuperAdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .issuer
        .authenticate(AuthRequest::SuperAdmin {
            username: req.username,
            password: Password::new(req.password),
        })
        .await?;
    Ok((StatusCode::OK, Json(session)))
}

/// Log in as a family admin with the personal password chosen at registration
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthSession),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Registration still pending approval", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .issuer
        .authenticate(AuthRequest::Admin {
            email: req.email,
            password: Password::new(req.password),
        })
        .await?;
    Ok((StatusCode::OK, Json(session)))
}

/// Log in as a family member with the family's shared password
#[utoipa::path(
    post,
    path = "/member/login",
    request_body = MemberLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthSession),
        (status = 401, description = "Invalid credentials or not a member of this family", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn member_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<MemberLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .issuer
        .authenticate(AuthRequest::Member {
            email: req.email,
            family_name: req.family_name,
            family_password: Password::new(req.family_password),
        })
        .await?;
    Ok((StatusCode::OK, Json(session)))
}

/// Check a bearer token and return the identity it carries
#[utoipa::path(
    post,
    path = "/auth/verify-token",
    request_body = VerifyTokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = UserProfile),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyTokenRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let session = state.issuer.verify_token(req.token.trim()).await?;
    Ok(Json(session.profile()))
}

/// Profile of the current session
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current identity", body = UserProfile),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn me(ctx: SessionContext) -> Result<Json<UserProfile>, AppError> {
    let session = require(ctx.session(), ANY_ROLE, None)?;
    Ok(Json(session.profile()))
}

/// Revoke the current bearer token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse, AppError> {
    let session = require(ctx.session(), ANY_ROLE, None)?;
    state.issuer.logout(session).await?;
    Ok((StatusCode::OK, Json(MessageResponse::new("Logged out successfully"))))
}
