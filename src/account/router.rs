use axum::{
    Extension, Json, extract::State, http::StatusCode, middleware::from_fn_with_state,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use super::auth::middleware::require_auth;
use crate::account::entities::Account;
use crate::context::AppContext;

const ACCOUNTS_TAG: &str = "accounts";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterAccountRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterAccountResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PushTokenRequest {
    /// Device token issued by the platform push service
    #[schema(example = "fcm-device-token")]
    pub token: String,
}

pub fn router(context: Arc<AppContext>) -> OpenApiRouter<Arc<AppContext>> {
    let public_router = OpenApiRouter::new().routes(routes!(register_account));
    let auth_router = OpenApiRouter::new()
        .routes(routes!(add_push_token, remove_push_token))
        .layer(from_fn_with_state(context, require_auth));

    public_router.merge(auth_router)
}

#[utoipa::path(
    post,
    path = "/register",
    tag = ACCOUNTS_TAG,
    request_body = RegisterAccountRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterAccountResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered"),
        (status = 503, description = "Directory store unavailable")
    )
)]
async fn register_account(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<RegisterAccountRequest>,
) -> Result<impl IntoResponse, impl IntoResponse> {
    context
        .account_service
        .register_account(request.email, &request.password)
        .await
        .map(|account| {
            (
                StatusCode::CREATED,
                Json(RegisterAccountResponse { id: account.id }),
            )
        })
}

#[utoipa::path(
    put,
    path = "/tokens",
    tag = ACCOUNTS_TAG,
    request_body = PushTokenRequest,
    security(
        ("basic_auth" = [])
    ),
    responses(
        (status = 200, description = "Push token registered"),
        (status = 400, description = "Empty token"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Directory store unavailable")
    )
)]
async fn add_push_token(
    Extension(account): Extension<Account>,
    State(context): State<Arc<AppContext>>,
    Json(request): Json<PushTokenRequest>,
) -> Result<impl IntoResponse, impl IntoResponse> {
    context
        .account_service
        .add_push_token(account.id, request.token)
        .await
        .map(|_| StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/tokens",
    tag = ACCOUNTS_TAG,
    request_body = PushTokenRequest,
    security(
        ("basic_auth" = [])
    ),
    responses(
        (status = 200, description = "Push token removed"),
        (status = 400, description = "Empty token"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Directory store unavailable")
    )
)]
async fn remove_push_token(
    Extension(account): Extension<Account>,
    State(context): State<Arc<AppContext>>,
    Json(request): Json<PushTokenRequest>,
) -> Result<impl IntoResponse, impl IntoResponse> {
    context
        .account_service
        .remove_push_token(account.id, &request.token)
        .await
        .map(|_| StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::database::AccountDatabase;
    use crate::database::inmemory::InMemoryDatabase;
    use crate::notifications::gateway::dummy::DummyNotificationGateway;
    use crate::webserver;
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
    use tower::ServiceExt;

    fn json_request(method: &str, uri: &str, body: &str, credentials: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(credentials) = credentials {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Basic {}", BASE64.encode(credentials)),
            );
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn context(db: Arc<InMemoryDatabase>) -> Arc<AppContext> {
        Arc::new(AppContext::new(db, Arc::new(DummyNotificationGateway)))
    }

    #[tokio::test]
    async fn test_register_account() {
        let db = Arc::new(InMemoryDatabase::new());
        let app = webserver::app(context(db.clone()));

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/accounts/register",
                r#"{"email": "a@x.com", "password": "secret"}"#,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(db.fetch_account_by_email("a@x.com").await.unwrap().is_some());

        let response = app
            .oneshot(json_request(
                "POST",
                "/accounts/register",
                r#"{"email": "a@x.com", "password": "other"}"#,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_and_remove_push_token() {
        let db = Arc::new(InMemoryDatabase::new());
        let account = Account::new("a@x.com".to_string(), "secret").unwrap();
        db.upsert_account(account).await.unwrap();
        let app = webserver::app(context(db.clone()));

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/accounts/tokens",
                r#"{"token": "device-1"}"#,
                Some("a@x.com:secret"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            db.fetch_account_by_email("a@x.com").await.unwrap().unwrap().push_tokens,
            vec!["device-1"]
        );

        let response = app
            .oneshot(json_request(
                "DELETE",
                "/accounts/tokens",
                r#"{"token": "device-1"}"#,
                Some("a@x.com:secret"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            db.fetch_account_by_email("a@x.com")
                .await
                .unwrap()
                .unwrap()
                .push_tokens
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_push_token_requires_authentication() {
        let db = Arc::new(InMemoryDatabase::new());
        let app = webserver::app(context(db));

        let response = app
            .oneshot(json_request(
                "PUT",
                "/accounts/tokens",
                r#"{"token": "device-1"}"#,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
