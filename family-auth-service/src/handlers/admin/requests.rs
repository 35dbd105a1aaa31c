//! Super admin review of onboarding requests.

use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::onboarding::{
        ApproveRequest, ApproveResponse, RejectRequest, RejectResponse, RequestListResponse,
    },
    middleware::SessionContext,
    models::{OnboardingRequest, Role},
    services::require,
    utils::ValidatedJson,
    AppState,
};

const REVIEWERS: &[Role] = &[Role::SuperAdmin];

fn list_response(requests: Vec<OnboardingRequest>) -> RequestListResponse {
    requests
        .iter()
        .map(OnboardingRequest::view)
        .collect::<Vec<_>>()
        .into()
}

/// Pending requests, oldest first
#[utoipa::path(
    get,
    path = "/admin/requests/pending",
    responses(
        (status = 200, description = "Pending requests", body = RequestListResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "Onboarding Review",
    security(("bearer_auth" = []))
)]
pub async fn list_pending(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<RequestListResponse>, AppError> {
    require(ctx.session(), REVIEWERS, None)?;
    let requests = state.ledger.list_pending().await?;
    Ok(Json(list_response(requests)))
}

/// Every request in any state, oldest first
#[utoipa::path(
    get,
    path = "/admin/requests/all",
    responses(
        (status = 200, description = "All requests", body = RequestListResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "Onboarding Review",
    security(("bearer_auth" = []))
)]
pub async fn list_all(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<RequestListResponse>, AppError> {
    require(ctx.session(), REVIEWERS, None)?;
    let requests = state.ledger.list_all().await?;
    Ok(Json(list_response(requests)))
}

/// Approve a pending request and provision its family admin
#[utoipa::path(
    post,
    path = "/admin/request/approve",
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Request approved", body = ApproveResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request already decided or credential conflict", body = ErrorResponse)
    ),
    tag = "Onboarding Review",
    security(("bearer_auth" = []))
)]
pub async fn approve(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: Result<ValidatedJson<ApproveRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let reviewer = require(ctx.session(), REVIEWERS, None)?;
    let ValidatedJson(req) = body?;
    let admin = state
        .ledger
        .approve(req.request_id, Some(reviewer.user_id))
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApproveResponse {
            message: "Request approved".to_string(),
            user: admin.sanitized(),
        }),
    ))
}

/// Reject a pending request with a reason
#[utoipa::path(
    post,
    path = "/admin/request/reject",
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Request rejected", body = RejectResponse),
        (status = 400, description = "Rejection reason is required", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request already decided", body = ErrorResponse)
    ),
    tag = "Onboarding Review",
    security(("bearer_auth" = []))
)]
pub async fn reject(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: Result<ValidatedJson<RejectRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let reviewer = require(ctx.session(), REVIEWERS, None)?;
    let ValidatedJson(req) = body?;
    let request = state
        .ledger
        .reject(req.request_id, &req.reason, Some(reviewer.user_id))
        .await?;
    Ok((
        StatusCode::OK,
        Json(RejectResponse {
            message: "Request rejected".to_string(),
            request: request.view(),
        }),
    ))
}
