use crate::provider::clerk::DEFAULT_API_URL;
use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

pub const ARG_SECRET_KEY: &str = "secret-key";
pub const ARG_API_URL: &str = "api-url";
pub const ARG_PROVIDER_TIMEOUT: &str = "provider-timeout";
pub const ARG_AUTHORIZED_PARTIES: &str = "authorized-parties";

#[derive(Debug, Clone)]
pub struct Options {
    pub api_url: Url,
    pub secret_key: SecretString,
    pub timeout: Option<Duration>,
    pub authorized_parties: Vec<String>,
}

impl Options {
    /// Parse identity-provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret key is missing or the API URL is not http(s).
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let secret_key = match matches.get_one::<String>(ARG_SECRET_KEY) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.trim().to_string()),
            _ => bail!("missing required argument: --{ARG_SECRET_KEY}"),
        };

        let api_url = matches
            .get_one::<String>(ARG_API_URL)
            .map_or(DEFAULT_API_URL, String::as_str);
        let api_url =
            Url::parse(api_url).with_context(|| format!("invalid --{ARG_API_URL}: {api_url}"))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            bail!("--{ARG_API_URL} must be an http(s) URL, got: {api_url}");
        }

        let timeout = matches
            .get_one::<u64>(ARG_PROVIDER_TIMEOUT)
            .copied()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let authorized_parties = matches
            .get_many::<String>(ARG_AUTHORIZED_PARTIES)
            .map(|parties| {
                parties
                    .map(|party| party.trim().to_string())
                    .filter(|party| !party.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            api_url,
            secret_key,
            timeout,
            authorized_parties,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long(ARG_SECRET_KEY)
                .help("Identity provider secret key")
                .env("CLERK_SECRET_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Identity provider Backend API base URL")
                .default_value(DEFAULT_API_URL)
                .env("CLERK_API_URL"),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT)
                .long(ARG_PROVIDER_TIMEOUT)
                .help("Timeout in seconds for calls to the identity provider (0 disables)")
                .env("AUTHGATE_PROVIDER_TIMEOUT")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_AUTHORIZED_PARTIES)
                .long(ARG_AUTHORIZED_PARTIES)
                .help("Comma-separated origins accepted in the session token `azp` claim")
                .long_help(
                    "Comma-separated origins accepted in the session token `azp` claim.\n\nWhen unset, tokens from any party are accepted.",
                )
                .env("AUTHGATE_AUTHORIZED_PARTIES")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
}
