use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;

use crate::{models::Session, AppState};

/// The caller's session for this request, if any. Built once by
/// [`session_middleware`]; absent or invalid bearer tokens yield `None` and
/// the Access Gate turns that into a 401 where a session is required.
#[derive(Debug, Clone, Default)]
pub struct SessionContext(pub Option<Session>);

impl SessionContext {
    pub fn session(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

/// Bearer token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the bearer token into a [`SessionContext`]. Never rejects.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = match bearer_token(req.headers()) {
        Some(token) => match state.issuer.verify_token(token).await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token not accepted");
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(SessionContext(session));
    next.run(req).await
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
