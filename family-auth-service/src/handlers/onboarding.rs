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
    dtos::onboarding::{AdminRegisterRequest, AdminRegisterResponse},
    models::OnboardingRequestView,
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

pub const REQUEST_SUBMITTED: &str =
    "Your request has been submitted and is awaiting SuperAdmin approval.";

/// Submit a request to administer a new family
#[utoipa::path(
    post,
    path = "/admin/register",
    request_body = AdminRegisterRequest,
    responses(
        (status = 201, description = "Request recorded as pending", body = AdminRegisterResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email or family name already taken", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Onboarding"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AdminRegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.ledger.submit(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(AdminRegisterResponse {
            request_id: request.id,
            status: request.status,
            message: REQUEST_SUBMITTED.to_string(),
        }),
    ))
}

/// Poll the status of a registration request
#[utoipa::path(
    get,
    path = "/admin/status/{request_id}",
    params(
        ("request_id" = String, Path, description = "Id returned by /admin/register")
    ),
    responses(
        (status = 200, description = "Current request state", body = OnboardingRequestView),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Onboarding"
)]
pub async fn request_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<OnboardingRequestView>, AppError> {
    // An id that cannot exist reads the same as one that does not.
    let request_id =
        Uuid::parse_str(request_id.trim()).map_err(|_| ServiceError::RequestNotFound)?;
    let request = state.ledger.get_status(request_id).await?;
    Ok(Json(request.view()))
}
