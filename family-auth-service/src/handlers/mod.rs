//! HTTP handlers for the family auth service.

pub mod admin;
pub mod auth;
pub mod families;
pub mod metrics;
pub mod onboarding;
