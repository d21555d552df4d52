pub mod oauth;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::{collections::BTreeMap, path::Path, sync::Arc};
use tracing::{debug, error, instrument};

use self::oauth::{AccessTokenProvider, ServiceAccountKey, ServiceAccountTokenProvider};
use super::{NotificationError, NotificationGateway, delivery_report, send_each_bounded};
use crate::notifications::entities::PushPayload;

/// Upper bound of concurrent `messages:send` requests for one dispatch
const FCM_MAX_IN_FLIGHT: usize = 64;

#[derive(Serialize)]
struct FcmSendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

/// Firebase Cloud Messaging gateway on the HTTP v1 API.
///
/// The v1 API addresses one device per request, so a dispatch fans out into
/// `messages:send` calls that share one OAuth token.
pub struct FcmNotificationGateway {
    client: Client,
    send_url: String,
    access_tokens: Arc<dyn AccessTokenProvider>,
}

impl FcmNotificationGateway {
    pub fn new(
        client: Client,
        base_url: &str,
        project_id: &str,
        access_tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, NotificationError> {
        if project_id.is_empty() {
            return Err(NotificationError::InitializationFailed(
                "FCM project id is empty".to_string(),
            ));
        }

        Ok(Self {
            client,
            send_url: format!(
                "{}/v1/projects/{project_id}/messages:send",
                base_url.trim_end_matches('/')
            ),
            access_tokens,
        })
    }

    /// Builds the gateway from a service account key file.
    /// `project_id` overrides the project named in the key.
    pub fn from_service_account_file<P: AsRef<Path>>(
        client: Client,
        base_url: &str,
        key_path: P,
        project_id: Option<&str>,
    ) -> Result<Self, NotificationError> {
        let key = ServiceAccountKey::from_file(key_path)?;
        let project_id = project_id.unwrap_or(&key.project_id).to_string();
        let access_tokens = ServiceAccountTokenProvider::new(client.clone(), key)?;

        Self::new(client, base_url, &project_id, Arc::new(access_tokens))
    }

    /// Sends to a single device. Rejections of the token itself come back as a failed result
    /// entry, rejections of the credentials or an unreachable API as an error.
    async fn send_message(
        &self,
        token: &str,
        payload: &PushPayload,
        access_token: &str,
    ) -> Result<Value, NotificationError> {
        let request = FcmSendRequest {
            message: FcmMessage {
                token,
                notification: FcmNotification {
                    title: &payload.title,
                    body: &payload.body,
                },
                data: &payload.data,
            },
        };

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailure(format!("FCM request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response
                .json()
                .await
                .map_err(|e| NotificationError::SendFailure(format!("Invalid FCM response: {e}")))?;
            return Ok(json!({ "token": token, "success": true, "name": body["name"] }));
        }

        let error_text = response.text().await.unwrap_or_default();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            error!("FCM API error - Status: {}, Response: {}", status, error_text);
            return Err(NotificationError::SendFailure(format!(
                "FCM rejected credentials ({status}): {error_text}"
            )));
        }

        debug!(%status, "FCM rejected token");
        Ok(json!({
            "token": token,
            "success": false,
            "error": fcm_error_code(status, &error_text),
        }))
    }
}

#[async_trait]
impl NotificationGateway for FcmNotificationGateway {
    #[instrument(skip_all, fields(tokens = tokens.len()))]
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> Result<Value, NotificationError> {
        let access_token = self.access_tokens.access_token().await?;

        let outcomes = send_each_bounded(tokens, FCM_MAX_IN_FLIGHT, |token| {
            self.send_message(token, payload, &access_token)
        })
        .await;
        let results = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;

        let report = delivery_report(results);
        debug!(
            "FCM dispatch finished: {} succeeded, {} failed",
            report["success"], report["failure"]
        );
        Ok(report)
    }
}

/// Picks the most specific code out of a v1 error body: the FCM `errorCode` detail
/// (e.g. `UNREGISTERED`), then the RPC status, then the HTTP status.
fn fcm_error_code(status: StatusCode, error_text: &str) -> String {
    let body: Value = serde_json::from_str(error_text).unwrap_or(Value::Null);
    let error = &body["error"];

    error["details"]
        .as_array()
        .and_then(|details| {
            details
                .iter()
                .find_map(|detail| detail["errorCode"].as_str())
        })
        .or_else(|| error["status"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}
