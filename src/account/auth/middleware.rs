use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::header::AuthHeader;
use crate::context::AppContext;

/// Resolves Basic credentials to an account and exposes it to handlers as an `Extension<Account>`
pub async fn require_auth(
    State(context): State<Arc<AppContext>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, Response> {
    let auth_header_str = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| StatusCode::UNAUTHORIZED.into_response())?;

    let auth_header = AuthHeader::parse(auth_header_str).map_err(|err| {
        debug!("Rejecting malformed auth header: {}", err);
        StatusCode::UNAUTHORIZED.into_response()
    })?;

    let authenticated_account = context
        .auth_service
        .authenticate(&auth_header.email, &auth_header.password)
        .await
        .map_err(IntoResponse::into_response)?;

    request.extensions_mut().insert(authenticated_account);

    Ok(next.run(request).await)
}
