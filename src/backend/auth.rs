//! Bearer token sources for the remote gateway.

use async_trait::async_trait;

/// Hands out a valid access token, or `None` when no credential is available.
///
/// Token refresh, if any, is the provider's business; the gateway only
/// attaches whatever it gets.
#[async_trait]
pub trait AuthTokenProvider: Send + Sync {
    async fn valid_access_token(&self) -> Option<String>;
}

/// Reads the token from an environment variable on every request.
pub struct EnvTokenProvider {
    var_name: String,
}

impl EnvTokenProvider {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self { var_name: var_name.into() }
    }
}

#[async_trait]
impl AuthTokenProvider for EnvTokenProvider {
    async fn valid_access_token(&self) -> Option<String> {
        std::env::var(&self.var_name).ok().filter(|token| !token.is_empty())
    }
}

/// Fixed token, or none at all.
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AuthTokenProvider for StaticTokenProvider {
    async fn valid_access_token(&self) -> Option<String> {
        self.token.clone()
    }
}
