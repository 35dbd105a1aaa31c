pub mod magic_link;
pub mod session;

pub use magic_link::{request_magic_link, verify_magic_link};
pub use session::{admin_login, logout, me, member_login, super_admin_login, verify_token};
