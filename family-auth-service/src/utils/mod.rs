pub mod password;
pub mod validation;

pub use password::{
    constant_time_str_eq, hash_password, verify_against_dummy, verify_password, Password,
    PasswordHashString,
};
pub use validation::{is_valid_family_name, normalize_email, ValidatedJson};
