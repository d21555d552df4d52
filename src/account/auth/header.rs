use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// Credentials carried by an HTTP Basic `Authorization` header
#[derive(Debug, PartialEq, Eq)]
pub struct AuthHeader {
    pub email: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthHeaderError {
    #[error("Invalid Basic auth format")]
    InvalidFormat,
    #[error("Failed to decode Base64")]
    Base64Error,
    #[error("Invalid UTF-8 in credentials")]
    Utf8Error,
    #[error("Missing email or password")]
    MissingCredentials,
}

impl AuthHeader {
    pub fn parse(auth_header: &str) -> Result<Self, AuthHeaderError> {
        let credentials = auth_header
            .strip_prefix("Basic ")
            .ok_or(AuthHeaderError::InvalidFormat)?;

        let decoded = BASE64
            .decode(credentials.trim())
            .map_err(|_| AuthHeaderError::Base64Error)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthHeaderError::Utf8Error)?;

        // Emails never contain ':', passwords may
        let (email, password) = decoded
            .split_once(':')
            .ok_or(AuthHeaderError::MissingCredentials)?;
        if email.is_empty() {
            return Err(AuthHeaderError::MissingCredentials);
        }

        Ok(AuthHeader {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}
