//! Authentication-context middleware.
//!
//! Flow Overview: read the session credential (bearer header first, then the
//! `__session` cookie), verify it with the identity provider, and attach the
//! resulting [`AuthContext`] to the request extensions. Lax mode lets every
//! request through, signed out if needed; strict mode answers 401 before the
//! handler runs.

use super::error::ApiError;
use crate::provider::{AuthContext, IdentityProvider, ProviderError};
use axum::{
    extract::{Extension, Request},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{debug, error};

pub const SESSION_COOKIE_NAME: &str = "__session";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Missing or invalid credentials yield a signed-out context.
    #[default]
    Lax,
    /// Missing or invalid credentials are rejected with 401.
    Strict,
}

impl AuthMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lax => "lax",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            other => Err(format!("invalid auth mode: {other} (expected lax or strict)")),
        }
    }
}

/// Session credential presented by the caller, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let Some((key, val)) = pair.split_once('=') else {
            continue;
        };
        let val = val.trim();
        if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Lax middleware: always attaches a context, never rejects.
pub async fn lax(
    Extension(provider): Extension<Arc<dyn IdentityProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = match session_token(request.headers()) {
        None => AuthContext::signed_out(),
        Some(token) => match provider.authenticate(&token).await {
            Ok(context) => context,
            Err(err) => {
                debug!(error = %err, "session credential not accepted, continuing signed out");
                AuthContext::signed_out()
            }
        },
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Strict middleware: only verified sessions reach the handler.
///
/// # Errors
/// Returns [`ApiError::Unauthenticated`] for missing or invalid credentials and
/// [`ApiError::Provider`] when the provider's signing keys cannot be fetched.
pub async fn strict(
    Extension(provider): Extension<Arc<dyn IdentityProvider>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = session_token(request.headers()) else {
        debug!("request without session credential rejected");
        return Err(ApiError::Unauthenticated);
    };

    let context = match provider.authenticate(&token).await {
        Ok(context) if context.is_signed_in() => context,
        Ok(_) => return Err(ApiError::Unauthenticated),
        Err(ProviderError::Token(err)) => {
            debug!(error = %err, "session credential rejected");
            return Err(ApiError::Unauthenticated);
        }
        Err(err) => {
            error!(error = %err, "failed to verify session credential");
            return Err(ApiError::Provider(err));
        }
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let headers = headers(&[
            ("authorization", "Bearer header-token"),
            ("cookie", "__session=cookie-token"),
        ]);
        assert_eq!(session_token(&headers).as_deref(), Some("header-token"));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let headers = headers(&[("cookie", "theme=dark; flag; __session=abc.def.ghi; other=1")]);
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn empty_or_foreign_credentials_are_ignored() {
        assert!(session_token(&HeaderMap::new()).is_none());
        assert!(session_token(&headers(&[("authorization", "Bearer   ")])).is_none());
        assert!(session_token(&headers(&[("authorization", "Basic dXNlcjpwdw==")])).is_none());
        assert!(session_token(&headers(&[("cookie", "__session=")])).is_none());
        assert!(session_token(&headers(&[("cookie", "__client=abc")])).is_none());
    }

    #[test]
    fn auth_mode_parses_case_insensitively() {
        assert_eq!("lax".parse::<AuthMode>(), Ok(AuthMode::Lax));
        assert_eq!(" STRICT ".parse::<AuthMode>(), Ok(AuthMode::Strict));
        assert!("none".parse::<AuthMode>().is_err());
        assert_eq!(AuthMode::default(), AuthMode::Lax);
        assert_eq!(AuthMode::Strict.to_string(), "strict");
    }
}
