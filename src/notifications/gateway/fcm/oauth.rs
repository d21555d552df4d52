use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::notifications::gateway::NotificationError;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Cached tokens are renewed this long before Google expires them
const REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a Google service account JSON key used for FCM
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NotificationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            NotificationError::InitializationFailed(format!(
                "Reading service account key {} failed: {err}",
                path.display()
            ))
        })?;

        serde_json::from_str(&contents).map_err(|err| {
            NotificationError::InitializationFailed(format!("Invalid service account key: {err}"))
        })
    }
}

/// Source of OAuth bearer tokens for the FCM HTTP v1 API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, NotificationError>;
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges a signed service account assertion for an access token and caches it until
/// shortly before it expires
pub struct ServiceAccountTokenProvider {
    client: Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(client: Client, key: ServiceAccountKey) -> Result<Self, NotificationError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|err| {
            NotificationError::InitializationFailed(format!(
                "Invalid service account private key: {err}"
            ))
        })?;

        Ok(Self {
            client,
            key,
            signing_key,
            cached: Mutex::new(None),
        })
    }

    async fn request_token(&self) -> Result<CachedToken, NotificationError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: FCM_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let assertion =
            jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
                .map_err(|err| {
                    NotificationError::SendFailure(format!("Signing OAuth assertion failed: {err}"))
                })?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| NotificationError::SendFailure(format!("OAuth request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OAuth token error - Status: {}, Response: {}", status, error_text);
            return Err(NotificationError::SendFailure(format!(
                "OAuth token request rejected ({status})"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| NotificationError::SendFailure(format!("Invalid OAuth response: {e}")))?;
        debug!(expires_in = token.expires_in, "Obtained FCM access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in - REFRESH_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String, NotificationError> {
        // Held across the refresh so concurrent dispatches share one token request
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|token| token.expires_at > Utc::now()) {
            return Ok(token.access_token.clone());
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}
