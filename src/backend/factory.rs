//! Gateway factory for creating the remote gateway from configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use super::{EnvTokenProvider, HttpTaskGateway, TaskGateway};
use crate::config::RemoteConfig;

/// Create the configured gateway.
///
/// # Errors
/// Returns error if the HTTP client cannot be built
pub fn create_gateway(config: &RemoteConfig) -> Result<Arc<dyn TaskGateway>> {
    let tokens = Arc::new(EnvTokenProvider::new(config.api_token_env.clone()));
    let gateway = HttpTaskGateway::new(
        &config.base_url,
        config.user_id,
        Duration::from_secs(config.request_timeout_secs),
        tokens,
    )
    .with_context(|| format!("Failed to create gateway for {}", config.base_url))?;
    Ok(Arc::new(gateway))
}
