use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::{Next, from_fn};
use axum::response::IntoResponse;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::{
    Modify, OpenApi,
    openapi::{
        Info, OpenApiBuilder,
        security::{Http, HttpAuthScheme, SecurityScheme},
    },
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::{account, context::AppContext, dispatch, settings::WebserverSettings};

#[derive(OpenApi)]
#[openapi(modifiers(&BasicAuthAddon))]
struct ApiDoc;

struct BasicAuthAddon;

impl Modify for BasicAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "basic_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
        );
    }
}

/// Builds the full HTTP application, including the API docs
pub fn app(context: Arc<AppContext>) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/accounts", account::router(context.clone()))
        .nest("/dispatch", dispatch::router(context.clone()))
        .with_state(context)
        .layer(from_fn(error_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    let api = OpenApiBuilder::from(api)
        .info(Info::new("Push Dispatch Server API", env!("CARGO_PKG_VERSION")))
        .build();

    router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
}

pub async fn start(settings: &WebserverSettings, context: Arc<AppContext>) -> Result<()> {
    let router = app(context);

    let ip = settings
        .host
        .parse()
        .with_context(|| format!("Invalid webserver host: {}", settings.host))?;
    let addr = SocketAddr::new(ip, settings.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Binding to {addr} failed"))?;

    info!("Starting webserver on {}", listener.local_addr()?);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Webserver stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

async fn error_logging_middleware(request: Request<Body>, next: Next) -> impl IntoResponse {
    let path = request.uri().path().to_owned();
    let method = request.method().clone();

    let response = next.run(request).await;

    if !response.status().is_success() {
        let status = response.status();

        // Log error with context but without body
        tracing::error!(
            status = ?status,
            path = %path,
            method = %method,
            "Request error"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::inmemory::InMemoryDatabase;
    use crate::notifications::gateway::dummy::DummyNotificationGateway;

    fn context() -> Arc<AppContext> {
        Arc::new(AppContext::new(
            Arc::new(InMemoryDatabase::new()),
            Arc::new(DummyNotificationGateway),
        ))
    }

    #[tokio::test]
    async fn test_start_reports_bind_failure() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let settings = WebserverSettings {
            host: "127.0.0.1".to_string(),
            port: occupied.local_addr().unwrap().port(),
        };

        let result = start(&settings, context()).await;

        let err = result.expect_err("Binding an occupied port must fail");
        assert!(err.to_string().starts_with("Binding to"), "{err}");
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_host() {
        let settings = WebserverSettings {
            host: "not an address".to_string(),
            port: 0,
        };

        let result = start(&settings, context()).await;

        assert!(result.is_err());
    }
}
