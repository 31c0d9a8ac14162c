use crate::provider::AuthContext;
use axum::{extract::Extension, Json};
use tracing::debug;

/// Echo the authentication context attached by the auth middleware.
///
/// In lax mode a caller without a valid session gets the signed-out context
/// (every field `null`); strict mode never lets such a request get here.
pub async fn protected_endpoint(Extension(auth): Extension<AuthContext>) -> Json<AuthContext> {
    debug!(signed_in = auth.is_signed_in(), "protected endpoint");
    Json(auth)
}
