use super::models::Identity;
use async_trait::async_trait;
use subtle::ConstantTimeEq;

/// Resolves a bearer token to a caller identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Option<Identity>;
}

/// Single admin token from configuration, compared in constant time.
pub struct StaticTokenAuthenticator {
    token: String,
    username: String,
}

impl StaticTokenAuthenticator {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenAuthenticator")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Option<Identity> {
        if self.token.is_empty() || !secure_compare(token, &self.token) {
            return None;
        }
        Some(Identity::new(self.username.clone()))
    }
}
