use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::account::database::{AccountDatabase, AccountDatabaseError};
use crate::account::entities::Account;
use crate::crypto::salted_hash::SaltedHashError;

#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must not be empty")]
    InvalidPassword,

    #[error("Push token must not be empty")]
    InvalidToken,

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] AccountDatabaseError),
}

impl From<SaltedHashError> for AccountServiceError {
    fn from(err: SaltedHashError) -> Self {
        AccountServiceError::ProcessingFailed(err.to_string())
    }
}

impl IntoResponse for AccountServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            AccountServiceError::AccountNotFound => StatusCode::NOT_FOUND,
            AccountServiceError::EmailTaken => StatusCode::CONFLICT,
            AccountServiceError::InvalidEmail
            | AccountServiceError::InvalidPassword
            | AccountServiceError::InvalidToken => StatusCode::BAD_REQUEST,
            AccountServiceError::ProcessingFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AccountServiceError::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        status.into_response()
    }
}

pub struct AccountService<D: AccountDatabase + ?Sized> {
    account_db: Arc<D>,
}

impl<D: AccountDatabase + ?Sized> AccountService<D> {
    pub fn new(account_db: Arc<D>) -> Self {
        Self { account_db }
    }

    #[instrument(skip(self, password))]
    pub async fn register_account(
        &self,
        email: String,
        password: &str,
    ) -> Result<Account, AccountServiceError> {
        if !is_plausible_email(&email) {
            return Err(AccountServiceError::InvalidEmail);
        }
        if password.is_empty() {
            return Err(AccountServiceError::InvalidPassword);
        }

        if self.account_db.fetch_account_by_email(&email).await?.is_some() {
            return Err(AccountServiceError::EmailTaken);
        }

        // The lookup above only fails fast; the store decides races between registrations
        let account = Account::new(email, password)?;
        self.account_db
            .upsert_account(account.clone())
            .await
            .map_err(map_database_error)?;

        info!(account_id = %account.id, "Registered account");
        Ok(account)
    }

    /// Registers a device token so that dispatches addressed to this account reach the device
    #[instrument(skip(self, token))]
    pub async fn add_push_token(
        &self,
        account_id: Uuid,
        token: String,
    ) -> Result<(), AccountServiceError> {
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(AccountServiceError::InvalidToken);
        }

        self.account_db
            .add_push_token(account_id, token)
            .await
            .map_err(map_database_error)
    }

    #[instrument(skip(self, token))]
    pub async fn remove_push_token(
        &self,
        account_id: Uuid,
        token: &str,
    ) -> Result<(), AccountServiceError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AccountServiceError::InvalidToken);
        }

        self.account_db
            .remove_push_token(account_id, token)
            .await
            .map_err(map_database_error)
    }
}

fn map_database_error(err: AccountDatabaseError) -> AccountServiceError {
    match err {
        AccountDatabaseError::NotFound(_) => AccountServiceError::AccountNotFound,
        AccountDatabaseError::EmailTaken(_) => AccountServiceError::EmailTaken,
        _ => AccountServiceError::DatabaseError(err),
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !email.contains(':')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
