pub mod family;
pub mod magic_link;
pub mod onboarding_request;
pub mod role;
pub mod session;
pub mod user;

pub use family::{FamilyResponse, FamilyScope};
pub use magic_link::MagicLinkToken;
pub use onboarding_request::{OnboardingRequest, OnboardingRequestView, RequestStatus};
pub use role::Role;
pub use session::{Session, UserProfile};
pub use user::{UserCredential, UserResponse};
