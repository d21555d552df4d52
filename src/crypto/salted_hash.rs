use argon2::{
    Argon2,
    password_hash::{
        Error as Argon2Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use std::fmt::{self, Display, Formatter};

/// Argon2 PHC string of an account password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedHash(String);

impl SaltedHash {
    pub fn generate_from(password: &str) -> Result<Self, SaltedHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        Ok(Self(hash))
    }

    pub fn verify_password(&self, password: &str) -> Result<(), SaltedHashError> {
        let parsed_hash = PasswordHash::new(&self.0)?;
        Argon2::default().verify_password(password.as_bytes(), &parsed_hash)?;
        Ok(())
    }
}

impl TryFrom<String> for SaltedHash {
    type Error = SaltedHashError;

    /// Restores a stored hash, rejecting anything that is not a PHC string
    fn try_from(hash: String) -> Result<Self, Self::Error> {
        PasswordHash::new(&hash).map_err(|e| SaltedHashError::HashParseError(e.to_string()))?;
        Ok(Self(hash))
    }
}

impl Display for SaltedHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SaltedHashError {
    #[error("Password hash validation failed")]
    InvalidPassword,
    #[error("Failed to parse password hash {0}")]
    HashParseError(String),
}

impl From<Argon2Error> for SaltedHashError {
    fn from(err: Argon2Error) -> Self {
        match err {
            Argon2Error::Password => SaltedHashError::InvalidPassword,
            _ => SaltedHashError::HashParseError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_matching_password() {
        let hash = SaltedHash::generate_from("hunter2").unwrap();
        assert!(hash.verify_password("hunter2").is_ok());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = SaltedHash::generate_from("hunter2").unwrap();
        assert!(matches!(
            hash.verify_password("hunter3"),
            Err(SaltedHashError::InvalidPassword)
        ));
    }

    #[test]
    fn test_restore_from_stored_string() {
        let hash = SaltedHash::generate_from("hunter2").unwrap();
        let restored = SaltedHash::try_from(hash.to_string()).unwrap();
        assert_eq!(restored, hash);
        assert!(restored.verify_password("hunter2").is_ok());
    }

    #[test]
    fn test_restore_rejects_garbage() {
        assert!(matches!(
            SaltedHash::try_from("not a hash".to_string()),
            Err(SaltedHashError::HashParseError(_))
        ));
    }
}
