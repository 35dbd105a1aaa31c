//! Deprecated one-time email link login. Both routes answer 404 unless
//! `MAGIC_LINK_ENABLED` is set.

use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::auth::{MagicLinkRequest, MagicLinkVerifyRequest, MessageResponse},
    services::AuthRequest,
    utils::ValidatedJson,
    AppState,
};

pub const MAGIC_LINK_ACCEPTED: &str = "If that email belongs to a family member, a login link is on its way.";

/// Email a one-time login link
#[utoipa::path(
    post,
    path = "/auth/magic-link",
    request_body = MagicLinkRequest,
    responses(
        (status = 202, description = "Request accepted", body = MessageResponse),
        (status = 404, description = "Magic link login is disabled", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn request_magic_link(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<MagicLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.issuer.request_magic_link(&req.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(MAGIC_LINK_ACCEPTED)),
    ))
}

/// Exchange a one-time login link token for a session
#[utoipa::path(
    post,
    path = "/auth/magic-link/verify",
    request_body = MagicLinkVerifyRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthSession),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 404, description = "Magic link login is disabled", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_magic_link(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<MagicLinkVerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .issuer
        .authenticate(AuthRequest::MagicLink {
            email: req.email,
            token: req.token,
        })
        .await?;
    Ok((StatusCode::OK, Json(session)))
}
