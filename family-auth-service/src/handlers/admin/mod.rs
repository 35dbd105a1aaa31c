pub mod requests;

pub use requests::{approve, list_all, list_pending, reject};
