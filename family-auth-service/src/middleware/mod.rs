pub mod auth;

pub use auth::{bearer_token, session_middleware, SessionContext};
