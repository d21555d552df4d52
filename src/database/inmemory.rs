use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::account::{
    database::{AccountDatabase, AccountDatabaseError},
    entities::Account,
};

/// Directory store kept in process memory, for development and tests
#[derive(Default)]
pub struct InMemoryDatabase {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDatabase for InMemoryDatabase {
    async fn upsert_account(&self, account: Account) -> Result<(), AccountDatabaseError> {
        let mut account_lock = self
            .accounts
            .lock()
            .map_err(|_| AccountDatabaseError::OperationFailed)?;

        // Checked under the same lock as the insert, so concurrent registrations can't both win
        let email_taken = account_lock
            .values()
            .any(|existing| existing.email == account.email && existing.id != account.id);
        if email_taken {
            return Err(AccountDatabaseError::EmailTaken(account.email));
        }

        account_lock.insert(account.id, account);
        Ok(())
    }

    async fn fetch_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Account>, AccountDatabaseError> {
        let account_lock = self
            .accounts
            .lock()
            .map_err(|_| AccountDatabaseError::OperationFailed)?;

        let account = account_lock
            .values()
            .find(|account| account.email == email)
            .cloned();
        Ok(account)
    }

    async fn find_accounts_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<Account>, AccountDatabaseError> {
        let account_lock = self
            .accounts
            .lock()
            .map_err(|_| AccountDatabaseError::OperationFailed)?;

        // Follow the order of the requested emails so results are stable
        let mut seen = HashSet::new();
        let accounts = emails
            .iter()
            .filter(|email| seen.insert(email.as_str()))
            .filter_map(|email| {
                account_lock
                    .values()
                    .find(|account| &account.email == email)
                    .cloned()
            })
            .collect();
        Ok(accounts)
    }

    async fn add_push_token(&self, id: Uuid, token: String) -> Result<(), AccountDatabaseError> {
        let mut account_lock = self
            .accounts
            .lock()
            .map_err(|_| AccountDatabaseError::OperationFailed)?;

        let account = account_lock
            .get_mut(&id)
            .ok_or_else(|| AccountDatabaseError::NotFound(id.to_string()))?;

        if !account.push_tokens.contains(&token) {
            account.push_tokens.push(token);
        }
        Ok(())
    }

    async fn remove_push_token(&self, id: Uuid, token: &str) -> Result<(), AccountDatabaseError> {
        let mut account_lock = self
            .accounts
            .lock()
            .map_err(|_| AccountDatabaseError::OperationFailed)?;

        let account = account_lock
            .get_mut(&id)
            .ok_or_else(|| AccountDatabaseError::NotFound(id.to_string()))?;

        account.push_tokens.retain(|existing| existing != token);
        Ok(())
    }
}
