use a2::{
    Client, ClientConfig, DefaultNotificationBuilder, Endpoint, Error as A2Error,
    NotificationBuilder, NotificationOptions, Priority, Response,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::{fs::File, io::Read, path::Path};
use tracing::{debug, instrument};

use super::{NotificationError, NotificationGateway, delivery_report, send_each_bounded};
use crate::notifications::entities::PushPayload;

/// Upper bound of concurrent HTTP/2 streams opened towards APNs for one dispatch
const APNS_MAX_IN_FLIGHT: usize = 64;

/// APNS (Apple Push Notification Service) Gateway implementation
pub struct ApnsNotificationGateway {
    client: Client,
    bundle_id: String,
}

impl ApnsNotificationGateway {
    /// Create a new APNS gateway instance from raw private key data
    pub fn new(
        team_id: &str,
        key_id: &str,
        private_key: &[u8],
        bundle_id: &str,
        is_production: bool,
    ) -> Result<Self, NotificationError> {
        let endpoint = if is_production {
            Endpoint::Production
        } else {
            Endpoint::Sandbox
        };

        let config = ClientConfig::new(endpoint);
        let client = Client::token(private_key, key_id, team_id, config)
            .map_err(|err| NotificationError::InitializationFailed(err.to_string()))?;

        Ok(ApnsNotificationGateway {
            client,
            bundle_id: bundle_id.to_string(),
        })
    }

    /// Create a new APNS gateway instance from a private key file
    pub fn from_file<P: AsRef<Path>>(
        team_id: &str,
        key_id: &str,
        private_key_path: P,
        bundle_id: &str,
        is_production: bool,
    ) -> Result<Self, NotificationError> {
        let mut private_key = Vec::new();
        File::open(private_key_path)
            .and_then(|mut file| file.read_to_end(&mut private_key))
            .map_err(|err| NotificationError::InitializationFailed(err.to_string()))?;

        Self::new(team_id, key_id, &private_key, bundle_id, is_production)
    }

    async fn send_alert(&self, token: &str, payload: &PushPayload) -> Result<Response, A2Error> {
        let options = NotificationOptions {
            apns_topic: Some(&self.bundle_id),
            apns_priority: Some(Priority::High),
            ..Default::default()
        };

        let mut request = DefaultNotificationBuilder::new()
            .set_title(&payload.title)
            .set_body(&payload.body)
            .build(token, options);
        for (key, value) in &payload.data {
            request.add_custom_data(key, value)?;
        }

        self.client.send(request).await
    }
}

#[async_trait]
impl NotificationGateway for ApnsNotificationGateway {
    /// APNs has no multicast, so every token gets its own request
    #[instrument(skip_all, fields(tokens = tokens.len()))]
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> Result<Value, NotificationError> {
        let outcomes = send_each_bounded(tokens, APNS_MAX_IN_FLIGHT, |token| {
            self.send_alert(token, payload)
        })
        .await;

        let mut results = Vec::with_capacity(tokens.len());
        for (token, outcome) in tokens.iter().zip(outcomes) {
            match outcome {
                Ok(response) => {
                    results.push(json!({ "token": token, "success": true, "code": response.code }));
                }
                // Rejections of a single token do not fail the dispatch
                Err(A2Error::ResponseError(response)) => {
                    results.push(json!({
                        "token": token,
                        "success": false,
                        "code": response.code,
                        "error": format!("{:?}", response.error),
                    }));
                }
                Err(err) => return Err(err.into()),
            }
        }

        let report = delivery_report(results);
        debug!(
            "APNS multicast finished: {} succeeded, {} failed",
            report["success"], report["failure"]
        );
        Ok(report)
    }
}

impl From<A2Error> for NotificationError {
    fn from(err: A2Error) -> Self {
        NotificationError::SendFailure(format!("APNS error: {:?}", err))
    }
}
