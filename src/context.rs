use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::{
    account::{auth::service::AuthService, database::AccountDatabase, service::AccountService},
    database::{inmemory::InMemoryDatabase, pool::create_sqlite_pool, sqlite::SqliteDatabase},
    dispatch::service::DispatchService,
    notifications::gateway::{
        NotificationGateway, apns::ApnsNotificationGateway, dummy::DummyNotificationGateway,
        fcm::FcmNotificationGateway,
    },
    settings::{CoreDatabaseSettings, PushSettings, Settings},
};

pub struct AppContext {
    pub account_service: AccountService<dyn AccountDatabase>,
    pub auth_service: AuthService<dyn AccountDatabase>,
    pub dispatch_service: DispatchService<dyn AccountDatabase, dyn NotificationGateway>,
    sqlite_db: Option<Arc<SqliteDatabase>>,
}

impl AppContext {
    /// Wires the services onto an already constructed directory store and push transport
    pub fn new(
        account_db: Arc<dyn AccountDatabase>,
        notification_gateway: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            account_service: AccountService::new(account_db.clone()),
            auth_service: AuthService::new(account_db.clone()),
            dispatch_service: DispatchService::new(account_db, notification_gateway),
            sqlite_db: None,
        }
    }

    /// Creates every external client once and injects them into the services
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let mut sqlite_db = None;
        let account_db: Arc<dyn AccountDatabase> = match &settings.database.core {
            CoreDatabaseSettings::Sqlite { path } => {
                let pool = create_sqlite_pool(path).await?;
                let db = Arc::new(SqliteDatabase::new(
                    pool,
                    settings.database.lookup_chunk_size,
                ));
                db.init().await?;
                info!("Using sqlite directory store at {}", path);
                sqlite_db = Some(db.clone());
                db
            }
            CoreDatabaseSettings::InMemory => {
                info!("Using in-memory directory store");
                Arc::new(InMemoryDatabase::new())
            }
        };

        let notification_gateway: Arc<dyn NotificationGateway> = match &settings.push {
            PushSettings::Fcm {
                service_account_key,
                project_id,
                base_url,
            } => Arc::new(FcmNotificationGateway::from_service_account_file(
                reqwest::Client::new(),
                base_url,
                service_account_key,
                project_id.as_deref(),
            )?),
            PushSettings::Apns {
                team_id,
                key_id,
                bundle_id,
                private_key_path,
            } => Arc::new(ApnsNotificationGateway::from_file(
                team_id,
                key_id,
                private_key_path,
                bundle_id,
                !settings.development,
            )?),
            PushSettings::Dummy => Arc::new(DummyNotificationGateway),
        };

        let mut context = Self::new(account_db, notification_gateway);
        context.sqlite_db = sqlite_db;
        Ok(context)
    }

    /// Releases the clients created at startup
    pub async fn shutdown(&self) {
        if let Some(db) = &self.sqlite_db {
            db.close().await;
        }
        info!("Application context shut down");
    }
}
