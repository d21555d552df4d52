use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    middleware::from_fn_with_state,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::{
    entities::DispatchResult,
    error::{DispatchError, ErrorResponse},
};
use crate::{
    account::{auth::middleware::require_auth, entities::Account},
    context::AppContext,
};

const DISPATCH_TAG: &str = "dispatch";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendNotificationRequest {
    /// Emails of the users to notify, matched case-sensitively
    #[schema(example = json!(["alice@example.com", "bob@example.com"]))]
    pub emails: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

pub fn router(context: Arc<AppContext>) -> OpenApiRouter<Arc<AppContext>> {
    OpenApiRouter::new()
        .routes(routes!(send_notification))
        .layer(from_fn_with_state(context, require_auth))
}

#[utoipa::path(
    post,
    path = "/send",
    request_body = SendNotificationRequest,
    security(
        ("basic_auth" = [])
    ),
    responses(
        (status = 200, description = "Dispatch finished; success is false when no user had a device token", body = DispatchResult),
        (status = 400, description = "Missing or malformed recipients", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Push transport failed", body = ErrorResponse),
        (status = 503, description = "Directory store unavailable", body = ErrorResponse)
    ),
    tag = DISPATCH_TAG
)]
async fn send_notification(
    State(context): State<Arc<AppContext>>,
    Extension(account): Extension<Account>,
    request: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let Json(request) =
        request.map_err(|rejection| DispatchError::InvalidArgument(rejection.body_text()))?;

    info!(sender = %account.id, "Dispatch requested");
    context
        .dispatch_service
        .send(request.emails, request.title, request.body)
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::database::{AccountDatabase, AccountDatabaseError, MockAccountDatabase};
    use crate::database::inmemory::InMemoryDatabase;
    use crate::notifications::gateway::{MockNotificationGateway, NotificationError};
    use crate::webserver;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
    use mockall::predicate::{always, eq};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const SENDER: &str = "sender@x.com:secret";

    async fn context_with(gateway: MockNotificationGateway) -> Arc<AppContext> {
        let db = Arc::new(InMemoryDatabase::new());

        let sender = Account::new("sender@x.com".to_string(), "secret").unwrap();
        let mut alice = Account::new("a@x.com".to_string(), "pw").unwrap();
        alice.push_tokens = vec!["t1".to_string(), "t2".to_string()];
        let bob = Account::new("b@x.com".to_string(), "pw").unwrap();
        for account in [sender, alice, bob] {
            db.upsert_account(account).await.unwrap();
        }

        Arc::new(AppContext::new(db, Arc::new(gateway)))
    }

    fn send_request(body: &str, credentials: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/dispatch/send")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(credentials) = credentials {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Basic {}", BASE64.encode(credentials)),
            );
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_send_delivers_to_registered_tokens() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send_to_tokens()
            .once()
            .with(eq(vec!["t1".to_string(), "t2".to_string()]), always())
            .returning(|_, _| Ok(json!({ "success": 2, "failure": 0 })));

        let response = webserver::app(context_with(gateway).await)
            .oneshot(send_request(
                r#"{"emails": ["a@x.com", "b@x.com"], "title": "Hello", "body": "World"}"#,
                Some(SENDER),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "success": true,
                "deliveredTokenCount": 2,
                "response": { "success": 2, "failure": 0 }
            })
        );
    }

    #[tokio::test]
    async fn test_send_without_tokens_reports_no_recipients() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send_to_tokens().never();

        let response = webserver::app(context_with(gateway).await)
            .oneshot(send_request(
                r#"{"emails": ["b@x.com", "nobody@x.com"], "title": "Hello", "body": "World"}"#,
                Some(SENDER),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "success": false,
                "deliveredTokenCount": 0,
                "message": "No tokens found for these users."
            })
        );
    }

    #[tokio::test]
    async fn test_send_rejects_invalid_recipients() {
        for body in [
            r#"{"emails": [], "title": "Hello", "body": "World"}"#,
            r#"{"emails": "a@x.com", "title": "Hello", "body": "World"}"#,
            r#"{"title": "Hello", "body": "World"}"#,
            "not json",
        ] {
            let mut gateway = MockNotificationGateway::new();
            gateway.expect_send_to_tokens().never();

            let response = webserver::app(context_with(gateway).await)
                .oneshot(send_request(body, Some(SENDER)))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(
                json_body(response).await["error"]["kind"],
                "invalid-argument",
                "{body}"
            );
        }
    }

    #[tokio::test]
    async fn test_send_reports_transport_failure() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send_to_tokens()
            .once()
            .returning(|_, _| Err(NotificationError::SendFailure("FCM down".to_string())));

        let response = webserver::app(context_with(gateway).await)
            .oneshot(send_request(
                r#"{"emails": ["a@x.com"], "title": "Hello", "body": "World"}"#,
                Some(SENDER),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["kind"], "delivery-failed");
    }

    #[tokio::test]
    async fn test_send_requires_authentication() {
        for credentials in [None, Some("sender@x.com:wrong"), Some("nobody@x.com:secret")] {
            let mut gateway = MockNotificationGateway::new();
            gateway.expect_send_to_tokens().never();

            let response = webserver::app(context_with(gateway).await)
                .oneshot(send_request(
                    r#"{"emails": ["a@x.com"], "title": "Hello", "body": "World"}"#,
                    credentials,
                ))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_send_auth_store_outage_is_unavailable() {
        let mut db = MockAccountDatabase::new();
        db.expect_fetch_account_by_email()
            .once()
            .returning(|_| Err(AccountDatabaseError::OperationFailed));
        db.expect_find_accounts_by_emails().never();
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send_to_tokens().never();

        let context = Arc::new(AppContext::new(Arc::new(db), Arc::new(gateway)));
        let response = webserver::app(context)
            .oneshot(send_request(
                r#"{"emails": ["a@x.com"], "title": "Hello", "body": "World"}"#,
                Some(SENDER),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
