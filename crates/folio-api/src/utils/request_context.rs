//! Per-request caller context for logging and audit.

use crate::auth::{AuthenticatedUser, Identity};
use crate::state::AppState;
use crate::utils::ip_extraction::client_ip_from_parts;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use folio_infra::RequestId;
use std::convert::Infallible;
use std::sync::Arc;

/// Who is making the request, as far as the server can tell.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Option<Identity>,
    pub client_ip: String,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn username(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.username.as_str())
    }
}

impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<AuthenticatedUser>()
            .map(|AuthenticatedUser(identity)| identity.clone());
        let client_ip = client_ip_from_parts(
            &parts.headers,
            &parts.extensions,
            state.config.trusted_proxy_count,
        );
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|RequestId(id)| id.clone());

        Ok(Self {
            identity,
            client_ip,
            request_id,
        })
    }
}
