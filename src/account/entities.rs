use uuid::Uuid;

use crate::crypto::salted_hash::{SaltedHash, SaltedHashError};

/// A user record of the directory: who the user is and where their devices can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    /// Unique, case-sensitive lookup key
    pub email: String,
    pub auth_password_hash: SaltedHash,
    /// Device push tokens in registration order
    pub push_tokens: Vec<String>,
}

impl Account {
    pub fn new(email: String, auth_password: &str) -> Result<Self, SaltedHashError> {
        Ok(Self {
            id: Uuid::new_v4(),
            email,
            auth_password_hash: SaltedHash::generate_from(auth_password)?,
            push_tokens: Vec::new(),
        })
    }
}
