use crate::{
    api::{self, AuthMode},
    cli::telemetry,
    provider::{
        clerk::{ClerkClient, ClerkConfig},
        IdentityProvider,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub auth_mode: AuthMode,
    pub api_url: Url,
    pub secret_key: SecretString,
    pub provider_timeout: Option<Duration>,
    pub authorized_parties: Vec<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the provider client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        api_url = %args.api_url,
        timeout = ?args.provider_timeout,
        authorized_parties = ?args.authorized_parties,
        "configuring identity provider"
    );

    let config = ClerkConfig::new(args.api_url, args.secret_key)
        .with_timeout(args.provider_timeout)
        .with_authorized_parties(args.authorized_parties);

    let provider: Arc<dyn IdentityProvider> =
        Arc::new(ClerkClient::new(config).context("Failed to build identity provider client")?);

    let result = api::new(args.port, provider, args.auth_mode).await;

    telemetry::shutdown_tracer();

    result
}
