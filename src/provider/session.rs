//! Session token verification.
//!
//! Session tokens are short-lived RS256 JWTs signed by the provider. They are
//! verified locally against the cached JWKS, the provider is only contacted
//! to fetch keys.

use super::{jwks::Jwks, AuthContext};
use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::{
    pkcs1v15::{Signature, VerifyingKey},
    signature::Verifier,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::time::SystemTime;
use thiserror::Error;

pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 5;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    Format,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("unsupported key type: {0}")]
    KeyType(String),
    #[error("unknown key id: {0}")]
    UnknownKid(String),
    #[error("rsa error")]
    Rsa(#[from] rsa::Error),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("unauthorized party: {0}")]
    UnauthorizedParty(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub kid: String,
}

/// Claims the gateway reads from a provider session token.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    pub sid: Option<String>,
    pub azp: Option<String>,
    pub nbf: Option<i64>,
    pub iat: Option<i64>,
    pub org_id: Option<String>,
    pub org_role: Option<String>,
    pub org_slug: Option<String>,
    pub act: Option<Value>,
}

/// A verified token: typed claims plus the full claim set as sent.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedSession {
    pub claims: SessionClaims,
    pub raw: Map<String, Value>,
}

impl From<VerifiedSession> for AuthContext {
    fn from(session: VerifiedSession) -> Self {
        let VerifiedSession { claims, raw } = session;
        Self {
            session_id: claims.sid,
            user_id: Some(claims.sub),
            actor: claims.act,
            org_id: claims.org_id,
            org_role: claims.org_role,
            org_slug: claims.org_slug,
            session_claims: Some(raw),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions<'a> {
    /// Accepted `azp` values; empty accepts any.
    pub authorized_parties: &'a [String],
    pub clock_skew_seconds: i64,
    pub now_unix_seconds: i64,
}

fn b64d_json<T: DeserializeOwned>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn split_token(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split('.');
    let header = parts.next().ok_or(TokenError::Format)?;
    let claims = parts.next().ok_or(TokenError::Format)?;
    let signature = parts.next().ok_or(TokenError::Format)?;
    if parts.next().is_some() || header.is_empty() || claims.is_empty() || signature.is_empty() {
        return Err(TokenError::Format);
    }
    Ok((header, claims, signature))
}

/// Decode the JOSE header without verifying anything.
///
/// # Errors
/// Returns an error if the token is malformed.
pub fn decode_header(token: &str) -> Result<TokenHeader, TokenError> {
    let (header_b64, _, _) = split_token(token)?;
    b64d_json(header_b64)
}

/// Verify an RS256 session token and return its claims.
///
/// # Errors
///
/// Returns an error if:
/// - the token is malformed or contains invalid base64/json,
/// - the `kid` is unknown for the provided JWKS,
/// - the signature is invalid,
/// - the claims fail validation (`exp`, `nbf`, `azp`).
pub fn verify_session_token(
    token: &str,
    jwks: &Jwks,
    options: &VerifyOptions<'_>,
) -> Result<VerifiedSession, TokenError> {
    let (header_b64, claims_b64, signature_b64) = split_token(token)?;

    let header: TokenHeader = b64d_json(header_b64)?;
    if header.alg != "RS256" {
        return Err(TokenError::UnsupportedAlg(header.alg));
    }

    let jwk = jwks
        .find_by_kid(&header.kid)
        .ok_or_else(|| TokenError::UnknownKid(header.kid.clone()))?;

    let verifying_key = VerifyingKey::<Sha256>::new(jwk.to_rsa_public_key()?);
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature_bytes =
        Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| TokenError::Base64)?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|_| TokenError::InvalidSignature)?;
    verifying_key
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let raw: Map<String, Value> = b64d_json(claims_b64)?;
    let claims: SessionClaims = serde_json::from_value(Value::Object(raw.clone()))?;

    let now = options.now_unix_seconds;
    let skew = options.clock_skew_seconds;
    if claims.exp + skew <= now {
        return Err(TokenError::Expired);
    }
    if claims.nbf.is_some_and(|nbf| nbf - skew > now) {
        return Err(TokenError::NotYetValid);
    }
    if !options.authorized_parties.is_empty() {
        let azp = claims.azp.clone().unwrap_or_default();
        if !options.authorized_parties.iter().any(|party| *party == azp) {
            return Err(TokenError::UnauthorizedParty(azp));
        }
    }

    Ok(VerifiedSession { claims, raw })
}

/// Unix seconds for token time checks.
#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
