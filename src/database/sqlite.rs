use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteRow};
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

use crate::account::database::{AccountDatabase, AccountDatabaseError};
use crate::account::entities::Account;
use crate::crypto::salted_hash::{SaltedHash, SaltedHashError};

const ACCOUNT_COLUMNS: &str = r#"
    SELECT a.id, a.email, a.auth_password_hash, t.token
    FROM accounts a
    LEFT JOIN push_tokens t ON t.account_id = a.id
"#;

pub struct SqliteDatabase {
    pool: SqlitePool,
    lookup_chunk_size: usize,
}

impl SqliteDatabase {
    pub fn new(pool: SqlitePool, lookup_chunk_size: usize) -> Self {
        Self {
            pool,
            lookup_chunk_size: lookup_chunk_size.max(1),
        }
    }

    /// Creates the necessary tables if they don't exist
    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                auth_password_hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS push_tokens (
                account_id TEXT NOT NULL,
                token TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (account_id, token),
                FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_account_exists(&self, id: Uuid) -> Result<(), AccountDatabaseError> {
        let exists = sqlx::query("SELECT 1 FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(AccountDatabaseError::NotFound(id.to_string())),
        }
    }
}

// ACCOUNTS

impl From<sqlx::Error> for AccountDatabaseError {
    fn from(err: sqlx::Error) -> Self {
        error!("SQLite operation failed: {}", err);
        AccountDatabaseError::OperationFailed
    }
}

impl From<uuid::Error> for AccountDatabaseError {
    fn from(_: uuid::Error) -> Self {
        AccountDatabaseError::OperationFailed
    }
}

impl From<SaltedHashError> for AccountDatabaseError {
    fn from(_: SaltedHashError) -> Self {
        AccountDatabaseError::OperationFailed
    }
}

/// Folds joined account/token rows into accounts, keeping first-seen account order
/// and the row order of each account's tokens.
fn accounts_from_rows(rows: Vec<SqliteRow>) -> Result<Vec<Account>, AccountDatabaseError> {
    let mut accounts: Vec<Account> = Vec::new();
    let mut index_by_id: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let id_str: String = row.try_get("id")?;
        let id = Uuid::parse_str(&id_str)?;
        let token: Option<String> = row.try_get("token")?;

        let idx = match index_by_id.get(&id) {
            Some(idx) => *idx,
            None => {
                let hash: String = row.try_get("auth_password_hash")?;
                accounts.push(Account {
                    id,
                    email: row.try_get("email")?,
                    auth_password_hash: SaltedHash::try_from(hash)?,
                    push_tokens: Vec::new(),
                });
                index_by_id.insert(id, accounts.len() - 1);
                accounts.len() - 1
            }
        };

        if let Some(token) = token {
            accounts[idx].push_tokens.push(token);
        }
    }

    Ok(accounts)
}

#[async_trait]
impl AccountDatabase for SqliteDatabase {
    async fn upsert_account(&self, account: Account) -> Result<(), AccountDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let id = account.id.to_string();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, auth_password_hash)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                auth_password_hash = excluded.auth_password_hash
            "#,
        )
        .bind(id.as_str())
        .bind(account.email.as_str())
        .bind(account.auth_password_hash.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            // ON CONFLICT(id) absorbs id clashes, so the email column is the only one left
            let email_taken = err
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation());
            if email_taken {
                AccountDatabaseError::EmailTaken(account.email.clone())
            } else {
                AccountDatabaseError::from(err)
            }
        })?;

        sqlx::query("DELETE FROM push_tokens WHERE account_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        for (position, token) in account.push_tokens.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO push_tokens (account_id, token, position)
                VALUES (?, ?, ?)
                ON CONFLICT(account_id, token) DO NOTHING
                "#,
            )
            .bind(id.as_str())
            .bind(token.as_str())
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Account>, AccountDatabaseError> {
        let rows = sqlx::query(&format!(
            "{ACCOUNT_COLUMNS} WHERE a.email = ? ORDER BY t.position"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts_from_rows(rows)?.into_iter().next())
    }

    async fn find_accounts_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<Account>, AccountDatabaseError> {
        let mut accounts = Vec::new();

        // Keeps the number of bound variables per statement below SQLite's limit
        for chunk in emails.chunks(self.lookup_chunk_size) {
            let mut query = QueryBuilder::<Sqlite>::new(ACCOUNT_COLUMNS);
            query.push(" WHERE a.email IN (");
            {
                let mut separated = query.separated(", ");
                for email in chunk {
                    separated.push_bind(email.as_str());
                }
            }
            query.push(") ORDER BY a.email, t.position");

            let rows = query.build().fetch_all(&self.pool).await?;
            accounts.extend(accounts_from_rows(rows)?);
        }

        Ok(accounts)
    }

    async fn add_push_token(&self, id: Uuid, token: String) -> Result<(), AccountDatabaseError> {
        self.ensure_account_exists(id).await?;

        sqlx::query(
            r#"
            INSERT INTO push_tokens (account_id, token, position)
            VALUES (
                ?1,
                ?2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM push_tokens WHERE account_id = ?1)
            )
            ON CONFLICT(account_id, token) DO NOTHING
            "#,
        )
        .bind(id.to_string())
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_push_token(&self, id: Uuid, token: &str) -> Result<(), AccountDatabaseError> {
        self.ensure_account_exists(id).await?;

        sqlx::query("DELETE FROM push_tokens WHERE account_id = ? AND token = ?")
            .bind(id.to_string())
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
