use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use super::{NotificationError, NotificationGateway};
use crate::notifications::entities::PushPayload;

/// Logs notifications instead of delivering them
pub struct DummyNotificationGateway;

#[async_trait]
impl NotificationGateway for DummyNotificationGateway {
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> Result<Value, NotificationError> {
        for token in tokens {
            info!(title = %payload.title, "Notification to {}", token);
        }
        Ok(json!({ "success": tokens.len(), "failure": 0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_every_token_as_delivered() {
        let tokens = vec!["t1".to_string(), "t2".to_string()];
        let response = DummyNotificationGateway
            .send_to_tokens(&tokens, &PushPayload::custom("Hi", "There"))
            .await
            .unwrap();

        assert_eq!(response, json!({ "success": 2, "failure": 0 }));
    }
}
