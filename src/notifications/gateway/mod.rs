pub mod apns;
pub mod dummy;
pub mod fcm;

use async_trait::async_trait;
use futures::{Future, StreamExt, stream};
use serde_json::{Value, json};
use thiserror::Error;

use super::entities::PushPayload;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Failed to send notification: {0}")]
    SendFailure(String),

    #[error("Failed to initialize notification service: {0}")]
    InitializationFailed(String),
}

/// Push transport able to address many device tokens in one call.
///
/// Delivery is best effort per token: rejected tokens are reported inside the returned
/// result, only a failure of the transport as a whole is an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> Result<Value, NotificationError>;
}

/// Runs `send` once per token with at most `limit` sends in flight.
/// Outcomes come back in token order.
fn send_each_bounded<'a, F, Fut, T>(
    tokens: &'a [String],
    limit: usize,
    send: F,
) -> impl Future<Output = Vec<T>> + Send + 'a
where
    F: FnMut(&'a String) -> Fut + Send + 'a,
    Fut: Future<Output = T> + Send + 'a,
    T: Send + 'a,
{
    stream::iter(tokens)
        .map(send)
        .buffered(limit.max(1))
        .collect()
}

/// Wraps per-token results, each carrying a boolean `success`, into `{success, failure, results}`
fn delivery_report(results: Vec<Value>) -> Value {
    let success = results
        .iter()
        .filter(|result| result["success"].as_bool().unwrap_or(false))
        .count();
    let failure = results.len() - success;

    json!({ "success": success, "failure": failure, "results": results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_each_bounded_caps_in_flight_sends() {
        let tokens: Vec<String> = (0..50).map(|i| format!("token-{i}")).collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let outcomes = send_each_bounded(&tokens, 4, |token| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                token.clone()
            }
        })
        .await;

        assert_eq!(outcomes, tokens);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_delivery_report_counts_outcomes() {
        let report = delivery_report(vec![
            json!({ "token": "t1", "success": true }),
            json!({ "token": "t2", "success": false, "error": "UNREGISTERED" }),
            json!({ "token": "t3", "success": true }),
        ]);

        assert_eq!(report["success"], 2);
        assert_eq!(report["failure"], 1);
        assert_eq!(report["results"][1]["token"], "t2");
    }
}
