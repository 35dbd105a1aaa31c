//! Access gate: the single authorization predicate for protected handlers.

use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Role, Session};
use crate::services::metrics::record_gate_denial;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No valid session.
    Unauthenticated,
    /// Session role is not in the allowed set.
    RoleNotAllowed,
    /// Session is not bound to the required family.
    FamilyMismatch,
}

impl Denial {
    fn as_str(&self) -> &'static str {
        match self {
            Denial::Unauthenticated => "unauthenticated",
            Denial::RoleNotAllowed => "role_not_allowed",
            Denial::FamilyMismatch => "family_mismatch",
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => {
                AppError::Unauthenticated(anyhow::anyhow!("Authentication required"))
            }
            Denial::RoleNotAllowed => {
                AppError::Forbidden(anyhow::anyhow!("Insufficient permissions"))
            }
            Denial::FamilyMismatch => {
                AppError::Forbidden(anyhow::anyhow!("Access to this family is not permitted"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

/// Decide whether `session` may act.
///
/// A `required_family_id` is matched against the session's own family, so a
/// super_admin (which has none) never passes a family-scoped check.
pub fn authorize(
    session: Option<&Session>,
    allowed_roles: &[Role],
    required_family_id: Option<Uuid>,
) -> Decision {
    let Some(session) = session else {
        return Decision::Deny(Denial::Unauthenticated);
    };

    if !allowed_roles.contains(&session.role) {
        return Decision::Deny(Denial::RoleNotAllowed);
    }

    if let Some(required) = required_family_id {
        if session.family_id != Some(required) {
            return Decision::Deny(Denial::FamilyMismatch);
        }
    }

    Decision::Allow
}

/// [`authorize`], returning the session on allow and the mapped error on deny.
pub fn require<'a>(
    session: Option<&'a Session>,
    allowed_roles: &[Role],
    required_family_id: Option<Uuid>,
) -> Result<&'a Session, AppError> {
    match (authorize(session, allowed_roles, required_family_id), session) {
        (Decision::Allow, Some(session)) => Ok(session),
        (Decision::Deny(denial), _) => {
            record_gate_denial(denial.as_str());
            tracing::debug!(reason = denial.as_str(), "Access denied");
            Err(denial.into())
        }
        (Decision::Allow, None) => Err(Denial::Unauthenticated.into()),
    }
}
