use crate::auth::models::AuthenticatedUser;
use crate::error::HttpAppError;
use crate::middleware::audit;
use crate::state::AppState;
use crate::utils::ip_extraction::client_ip_from_parts;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use folio_core::AppError;
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

fn reject(request: &Request, state: &AppState, reason: &str) -> Response {
    let client_ip = client_ip_from_parts(
        request.headers(),
        request.extensions(),
        state.config.trusted_proxy_count,
    );
    audit::log_authentication_failure(client_ip, request.uri().path().to_string(), reason);
    HttpAppError(AppError::Unauthorized(reason.to_string())).into_response()
}

/// Require a valid bearer token; stores the caller's identity in request
/// extensions as [`AuthenticatedUser`].
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(header) => match header.strip_prefix(BEARER_PREFIX) {
            Some(token) => token.trim().to_string(),
            None => return reject(&request, &state, "Invalid authorization header format"),
        },
        None => return reject(&request, &state, "Missing authorization header"),
    };

    let Some(identity) = state.authenticator.authenticate(&token).await else {
        return reject(&request, &state, "Invalid or expired token");
    };

    tracing::debug!(username = %identity.username, "Request authenticated");
    request.extensions_mut().insert(AuthenticatedUser(identity));

    next.run(request).await
}
