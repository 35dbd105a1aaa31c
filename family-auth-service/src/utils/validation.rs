use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON body extractor that runs `validator` rules and reports both malformed
/// JSON and rule violations as `validation_error` (400).
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| AppError::Validation(e.body_text()))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Trimmed, lower-cased form used for every stored and looked-up email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `^[a-zA-Z0-9_-]+$`
pub fn is_valid_family_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_name_charset() {
        assert!(is_valid_family_name("fam1"));
        assert!(is_valid_family_name("The_Sharma-Family"));
        assert!(!is_valid_family_name("bad name!"));
        assert!(!is_valid_family_name("fam.1"));
        assert!(!is_valid_family_name("परिवार"));
        assert!(!is_valid_family_name(""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }
}
