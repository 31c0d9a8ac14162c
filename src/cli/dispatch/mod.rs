//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to an [`Action`], currently only starting the
//! gateway with its identity-provider configuration.

use crate::{
    api::AuthMode,
    cli::{
        actions::{server::Args, Action},
        commands::{provider, ARG_AUTH_MODE, ARG_PORT},
    },
};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);
    let auth_mode = matches
        .get_one::<AuthMode>(ARG_AUTH_MODE)
        .copied()
        .unwrap_or_default();

    let provider_opts = provider::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        auth_mode,
        api_url: provider_opts.api_url,
        secret_key: provider_opts.secret_key,
        provider_timeout: provider_opts.timeout,
        authorized_parties: provider_opts.authorized_parties,
    }))
}
