//! Services layer: credential store, request ledger, session issuer, access
//! gate and their collaborators.

mod database;
pub mod error;
pub mod families;
pub mod gate;
mod jwt;
pub mod ledger;
mod memory_store;
pub mod metrics;
pub mod notifier;
pub mod revocation;
pub mod session_issuer;
pub mod store;

pub use database::PgStore;
pub use error::ServiceError;
pub use families::FamilyDirectory;
pub use gate::{authorize, require, Decision, Denial};
pub use jwt::{AccessTokenClaims, JwtService};
pub use ledger::RequestLedger;
pub use memory_store::InMemoryStore;
pub use notifier::{LogNotifier, MockNotifier, Notification, Notifier, SmtpNotifier};
pub use revocation::{InMemoryRevocationList, TokenRevocationList};
pub use session_issuer::{AuthRequest, AuthSession, SessionIssuer, SuperAdminAccount};
pub use store::{Approval, CredentialStore, StoreError};
