use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

use crate::{
    account::{
        database::{AccountDatabase, AccountDatabaseError},
        entities::Account,
    },
    crypto::salted_hash::SaltedHashError,
};

pub struct AuthService<D: AccountDatabase + ?Sized> {
    account_db: Arc<D>,
}

impl<D: AccountDatabase + ?Sized> AuthService<D> {
    pub fn new(account_db: Arc<D>) -> Self {
        Self { account_db }
    }

    /// Authenticates an email and password against the stored account
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let account = self
            .account_db
            .fetch_account_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        account.auth_password_hash.verify_password(password)?;
        Ok(account)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Processing auth failed")]
    ProcessingFailed,

    #[error("Database error: {0}")]
    DatabaseError(#[from] AccountDatabaseError),
}

impl From<SaltedHashError> for AuthError {
    fn from(err: SaltedHashError) -> Self {
        match err {
            SaltedHashError::InvalidPassword => AuthError::InvalidCredentials,
            SaltedHashError::HashParseError(_) => AuthError::ProcessingFailed,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::ProcessingFailed => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        status.into_response()
    }
}
