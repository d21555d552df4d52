use async_trait::async_trait;
use uuid::Uuid;

use super::entities::Account;

#[derive(Debug, thiserror::Error)]
pub enum AccountDatabaseError {
    #[error("Database operation failed")]
    OperationFailed,
    #[error("Account not found: {0}")]
    NotFound(String),
    #[error("Email is already registered: {0}")]
    EmailTaken(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDatabase: Send + Sync {
    /// Inserts or replaces the account with the same id.
    ///
    /// Fails with `EmailTaken` when a different account already holds the email.
    async fn upsert_account(&self, account: Account) -> Result<(), AccountDatabaseError>;

    async fn fetch_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Account>, AccountDatabaseError>;

    /// Returns every account whose email is one of `emails`.
    ///
    /// Unknown emails are skipped, so the result may be shorter than the input or empty.
    async fn find_accounts_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<Account>, AccountDatabaseError>;

    /// Appends a device token to the account. Registering a known token again is a no-op.
    async fn add_push_token(&self, id: Uuid, token: String) -> Result<(), AccountDatabaseError>;

    async fn remove_push_token(&self, id: Uuid, token: &str) -> Result<(), AccountDatabaseError>;
}
