use crate::auth::AuthenticatedUser;
use crate::error::HttpAppError;
use crate::middleware::audit;
use crate::state::AppState;
use crate::utils::ip_extraction::client_ip_from_parts;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use folio_core::AppError;
use std::sync::Arc;

fn set_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32) {
    if let Ok(header_value) = HeaderValue::from_str(&limit.to_string()) {
        response
            .headers_mut()
            .insert("X-RateLimit-Limit", header_value);
    }
    if let Ok(header_value) = HeaderValue::from_str(&remaining.to_string()) {
        response
            .headers_mut()
            .insert("X-RateLimit-Remaining", header_value);
    }
}

/// Upload rate limiting middleware
///
/// Runs after authentication. The key is the authenticated username
/// (`user:{name}`), falling back to the client IP (`ip:{addr}`). An exhausted
/// key is rejected with 429 before the request body is read; there is no
/// queueing.
///
/// # Headers
/// - `X-RateLimit-Limit`: uploads allowed per window
/// - `X-RateLimit-Remaining`: uploads left in the current window
/// - `Retry-After`: seconds until the window resets (429 only)
pub async fn upload_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = client_ip_from_parts(
        request.headers(),
        request.extensions(),
        state.config.trusted_proxy_count,
    );
    let rate_limit_key = match request.extensions().get::<AuthenticatedUser>() {
        Some(AuthenticatedUser(identity)) => format!("user:{}", identity.username),
        None => format!("ip:{}", client_ip),
    };

    let limiter = &state.rate_limiter;
    let limit = limiter.limit();

    match limiter.check_rate_limit(&rate_limit_key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            set_rate_limit_headers(&mut response, limit, remaining);
            response
        }
        Err(reset_in) => {
            // Round up so clients never retry a moment too early.
            let retry_after_secs = (reset_in.as_millis().div_ceil(1000) as u64).max(1);

            audit::log_rate_limit_exceeded(
                &rate_limit_key,
                client_ip,
                request.uri().path().to_string(),
                limit,
                retry_after_secs,
            );

            let mut response =
                HttpAppError(AppError::RateLimited { retry_after_secs }).into_response();
            set_rate_limit_headers(&mut response, limit, 0);
            response
        }
    }
}
