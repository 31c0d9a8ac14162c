//! Client for the Clerk Backend API.
//!
//! Every call carries the instance secret key as a bearer token. Users are
//! decoded from Clerk's snake_case wire format into [`User`]; error bodies of
//! the form `{"errors": [{"message", "long_message", "code"}]}` become
//! [`ProviderError::Api`].

use super::{
    jwks::{Jwks, JwksCache, JWKS_CACHE_TTL_SECONDS},
    session::{self, VerifyOptions, DEFAULT_CLOCK_SKEW_SECONDS},
    AuthContext, EmailAddress, IdentityProvider, NewUser, ProviderError, User, UserListQuery,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.clerk.com";

#[derive(Debug, Clone)]
pub struct ClerkConfig {
    pub api_url: Url,
    pub secret_key: SecretString,
    /// Per-request timeout; `None` waits for the provider indefinitely.
    pub timeout: Option<Duration>,
    /// Accepted `azp` claims for session tokens; empty accepts any.
    pub authorized_parties: Vec<String>,
    /// How long a fetched JWKS is trusted before refetching.
    pub jwks_ttl: Duration,
}

impl ClerkConfig {
    #[must_use]
    pub fn new(api_url: Url, secret_key: SecretString) -> Self {
        Self {
            api_url,
            secret_key,
            timeout: None,
            authorized_parties: Vec::new(),
            jwks_ttl: Duration::from_secs(JWKS_CACHE_TTL_SECONDS),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_jwks_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_authorized_parties(mut self, parties: Vec<String>) -> Self {
        self.authorized_parties = parties;
        self
    }
}

#[derive(Debug)]
pub struct ClerkClient {
    client: Client,
    api_url: Url,
    secret_key: SecretString,
    authorized_parties: Vec<String>,
    jwks: JwksCache,
}

impl ClerkClient {
    /// Build the HTTP client once; it is shared by every request.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ClerkConfig) -> Result<Self, ProviderError> {
        let mut builder = Client::builder().user_agent(crate::APP_USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_url: with_trailing_slash(config.api_url),
            secret_key: config.secret_key,
            authorized_parties: config.authorized_parties,
            jwks: JwksCache::new(config.jwks_ttl),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        Ok(self.api_url.join(path)?)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_jwks(&self) -> Result<Jwks, ProviderError> {
        let url = self.endpoint("v1/jwks")?;
        let span = info_span!("provider.fetch_jwks", http.method = "GET", url = %url);
        let jwks: Jwks = self.send(self.client.get(url)).instrument(span).await?;
        info!(keys = jwks.keys.len(), "provider jwks cache refreshed");
        Ok(jwks)
    }

    /// Cached JWKS that should contain `kid`, refreshing when stale or missing the key.
    ///
    /// After a failed refresh the cached keys are served without refetching
    /// until the cooldown elapses.
    async fn jwks_for(&self, kid: &str) -> Result<Jwks, ProviderError> {
        let (cached, fresh) = self.jwks.snapshot().await;
        let now = u64::try_from(session::now_unix_seconds()).unwrap_or(0);

        if !fresh && (cached.keys.is_empty() || !self.jwks.refresh_backoff_active(now)) {
            match self.fetch_jwks().await {
                Ok(jwks) => {
                    self.jwks.replace(jwks.clone()).await;
                    return Ok(jwks);
                }
                // Nothing cached yet: there is no key to fall back on.
                Err(err) if cached.keys.is_empty() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "failed to refresh provider jwks; using cached keys");
                    self.jwks.record_failed_refresh(now);
                    return Ok(cached);
                }
            }
        }

        if cached.find_by_kid(kid).is_none() && self.jwks.try_begin_forced_refresh(now) {
            debug!(kid, "unknown signing key, refreshing provider jwks");
            match self.fetch_jwks().await {
                Ok(jwks) => {
                    self.jwks.replace(jwks.clone()).await;
                    return Ok(jwks);
                }
                Err(err) => {
                    warn!(error = %err, "failed to refresh provider jwks");
                    self.jwks.record_failed_refresh(now);
                }
            }
        }

        Ok(cached)
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn list_users(&self, query: &UserListQuery) -> Result<Vec<User>, ProviderError> {
        let url = self.endpoint("v1/users")?;
        let span = info_span!("provider.list_users", http.method = "GET", url = %url);
        let users: Vec<ClerkUser> = self
            .send(self.client.get(url).query(query))
            .instrument(span)
            .await?;
        Ok(users.into_iter().map(User::from).collect())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ProviderError> {
        let url = self.endpoint("v1/users")?;
        let span = info_span!("provider.create_user", http.method = "POST", url = %url);
        let body = CreateUserBody::from(user);
        let created: ClerkUser = self
            .send(self.client.post(url).json(&body))
            .instrument(span)
            .await?;
        Ok(User::from(created))
    }

    async fn authenticate(&self, token: &str) -> Result<AuthContext, ProviderError> {
        let header = session::decode_header(token)?;
        let jwks = self.jwks_for(&header.kid).await?;
        let options = VerifyOptions {
            authorized_parties: &self.authorized_parties,
            clock_skew_seconds: DEFAULT_CLOCK_SKEW_SECONDS,
            now_unix_seconds: session::now_unix_seconds(),
        };
        let verified = session::verify_session_token(token, &jwks, &options)
            .map_err(ProviderError::Token)?;
        Ok(AuthContext::from(verified))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[derive(Debug, Deserialize)]
struct ClerkErrors {
    errors: Vec<ClerkErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ClerkErrorItem {
    message: Option<String>,
    long_message: Option<String>,
}

fn api_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ClerkErrors>(body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .and_then(|item| item.long_message.or(item.message))
        .unwrap_or_else(|| status.to_string());
    ProviderError::Api { status, message }
}

#[derive(Debug, Deserialize)]
struct ClerkEmailAddress {
    id: String,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    external_id: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ClerkEmailAddress>,
    primary_email_address_id: Option<String>,
    #[serde(default)]
    public_metadata: Value,
    #[serde(default)]
    private_metadata: Value,
    #[serde(default)]
    unsafe_metadata: Value,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
}

impl From<ClerkUser> for User {
    fn from(user: ClerkUser) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email_addresses: user
                .email_addresses
                .into_iter()
                .map(|email| EmailAddress {
                    id: email.id,
                    email_address: email.email_address,
                })
                .collect(),
            primary_email_address_id: user.primary_email_address_id,
            public_metadata: user.public_metadata,
            private_metadata: user.private_metadata,
            unsafe_metadata: user.unsafe_metadata,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    email_address: [&'a str; 1],
    password: &'a str,
    external_id: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    username: &'a str,
    public_metadata: &'a Value,
    private_metadata: &'a Value,
    unsafe_metadata: &'a Value,
}

impl<'a> From<&'a NewUser> for CreateUserBody<'a> {
    fn from(user: &'a NewUser) -> Self {
        Self {
            email_address: [user.email_address.as_str()],
            password: user.password.expose_secret(),
            external_id: &user.external_id,
            first_name: &user.first_name,
            last_name: &user.last_name,
            username: &user.username,
            public_metadata: &user.public_metadata,
            private_metadata: &user.private_metadata,
            unsafe_metadata: &user.unsafe_metadata,
        }
    }
}
