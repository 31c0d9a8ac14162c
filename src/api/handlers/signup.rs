use super::Message;
use crate::{
    api::error::{ApiError, ErrorBody},
    provider::{IdentityProvider, NewUser},
};
use axum::{extract::Extension, Json};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use std::{fmt, sync::Arc};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

pub const SIGNUP_MESSAGE: &str = "Created Successfully...";

#[derive(ToSchema, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[schema(value_type = Option<String>)]
    email_address: Option<Value>,
    #[schema(value_type = Option<String>, format = Password)]
    password: Option<Value>,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email_address", &self.email_address)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A field counts as present unless it is absent, `null`, `false`, `0` or `""`.
///
/// Present non-string values are forwarded in their JSON text form and left
/// for the identity provider to judge.
fn present(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON) => None,
        other => Some(other.to_string()),
    }
}

#[utoipa::path(
    post,
    path= "/signup",
    request_body = SignupRequest,
    responses (
        (status = 200, description = "User registered with the identity provider", body = Message, content_type = "application/json"),
        (status = 400, description = "Email or password missing", body = ErrorBody),
        (status = 500, description = "Identity provider rejected the user", body = ErrorBody),
    ),
    tag= "users"
)]
// axum handler for signup
#[instrument(skip(provider, payload))]
pub async fn signup(
    provider: Extension<Arc<dyn IdentityProvider>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<Json<Message>, ApiError> {
    // a missing or malformed body is treated like one without fields
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    debug!("signup: {:?}", request);

    let (Some(email_address), Some(password)) =
        (present(request.email_address), present(request.password))
    else {
        return Err(ApiError::MissingCredentials);
    };

    let user = NewUser::with_default_profile(email_address, SecretString::from(password));

    match provider.create_user(&user).await {
        Ok(created) => {
            info!("User created: {}", created.id);
            Ok(Json(Message::new(SIGNUP_MESSAGE)))
        }
        Err(e) => {
            error!("Error creating user: {}", e);
            Err(e.into())
        }
    }
}
