use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

/// Plaintext secret supplied by a caller. `Debug` is redacted so it can sit in
/// request structs that get logged.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, not bytes.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Argon2 PHC string.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    /// Accept only a well-formed PHC string, e.g. one supplied through config.
    pub fn parse(hash: &str) -> Result<Self, anyhow::Error> {
        PasswordHash::new(hash.trim())
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;
        Ok(Self(hash.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for PasswordHashString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHashString(***)")
    }
}

/// Hash a password using Argon2id with a random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Verify a password against a stored hash.
///
/// `Ok(false)` on mismatch; `Err` only when the stored hash is unparsable.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<bool, anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok())
}

/// Burn the same work as a real verification when there is no stored hash,
/// so "unknown account" and "wrong password" take the same time.
pub fn verify_against_dummy(password: &Password) {
    static DUMMY: OnceLock<Option<PasswordHashString>> = OnceLock::new();
    let dummy = DUMMY.get_or_init(|| hash_password(&Password::new("dummy-password")).ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}

/// Constant-time equality for short secrets such as usernames.
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = Password::new("mySecurePassword123");
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let password = Password::new("mySecurePassword123");
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(verify_password(&password, &hash).unwrap());
        assert!(!verify_password(&Password::new("wrongPassword"), &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        let result = verify_password(
            &Password::new("whatever"),
            &PasswordHashString::new("not-a-phc-string".to_string()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_accepts_only_phc_strings() {
        let hash = hash_password(&Password::new("pw")).unwrap();
        assert!(PasswordHashString::parse(hash.as_str()).is_ok());
        assert!(PasswordHashString::parse("plaintext").is_err());
    }

    #[test]
    fn test_debug_never_shows_secret() {
        let password = Password::new("hunter22");
        assert_eq!(format!("{:?}", password), "Password(***)");
    }

    #[test]
    fn test_constant_time_str_eq() {
        assert!(constant_time_str_eq("superadmin", "superadmin"));
        assert!(!constant_time_str_eq("superadmin", "superadmin2"));
        assert!(!constant_time_str_eq("", "x"));
    }
}
