use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::{IntoParams, ToSchema};

/// A user identity as stored by the identity provider.
///
/// Metadata visibility (public/private/unsafe) is enforced by the provider,
/// the gateway passes the buckets through untouched.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub external_id: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_addresses: Vec<EmailAddress>,
    pub primary_email_address_id: Option<String>,
    #[schema(value_type = Object)]
    pub public_metadata: Value,
    #[schema(value_type = Object)]
    pub private_metadata: Value,
    #[schema(value_type = Object)]
    pub unsafe_metadata: Value,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

/// Fields sent to the provider when registering a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email_address: String,
    pub password: SecretString,
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub public_metadata: Value,
    pub private_metadata: Value,
    pub unsafe_metadata: Value,
}

impl NewUser {
    /// Build a signup for `email_address` carrying the gateway's fixed default profile.
    #[must_use]
    pub fn with_default_profile(email_address: impl Into<String>, password: SecretString) -> Self {
        Self {
            email_address: email_address.into(),
            password,
            external_id: "a-unique-id".to_string(),
            first_name: "Ty".to_string(),
            last_name: "Haro".to_string(),
            username: "test001".to_string(),
            public_metadata: json!({ "gender": "female" }),
            private_metadata: json!({ "middleName": "Test" }),
            unsafe_metadata: json!({ "unsafe": "metadata" }),
        }
    }
}

/// Pagination forwarded to the provider's user listing.
#[derive(IntoParams, Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Maximum number of users to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Number of users to skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Per-request authentication state.
///
/// A signed-out context serializes with every field set to `null`.
#[derive(ToSchema, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub actor: Option<Value>,
    pub org_id: Option<String>,
    pub org_role: Option<String>,
    pub org_slug: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub session_claims: Option<Map<String, Value>>,
}

impl AuthContext {
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn signed_out_context_serializes_as_nulls() {
        let value = serde_json::to_value(AuthContext::signed_out()).unwrap_or_default();
        assert_eq!(
            value,
            json!({
                "sessionId": null,
                "userId": null,
                "actor": null,
                "orgId": null,
                "orgRole": null,
                "orgSlug": null,
                "sessionClaims": null,
            })
        );
        assert!(!AuthContext::signed_out().is_signed_in());
    }

    #[test]
    fn default_profile_keeps_supplied_credentials() {
        let password = SecretString::from("s3cret!".to_string());
        let user = NewUser::with_default_profile("ty@example.com", password);
        assert_eq!(user.email_address, "ty@example.com");
        assert_eq!(user.password.expose_secret(), "s3cret!");
        assert_eq!(user.external_id, "a-unique-id");
        assert_eq!(user.username, "test001");
        assert_eq!(user.public_metadata, json!({ "gender": "female" }));
        assert_eq!(user.private_metadata, json!({ "middleName": "Test" }));
        assert_eq!(user.unsafe_metadata, json!({ "unsafe": "metadata" }));
    }

    #[test]
    fn user_serializes_camel_case() {
        let user = User {
            id: "user_1".to_string(),
            first_name: Some("Ty".to_string()),
            email_addresses: vec![EmailAddress {
                id: "idn_1".to_string(),
                email_address: "ty@example.com".to_string(),
            }],
            ..User::default()
        };
        let value = serde_json::to_value(&user).unwrap_or_default();
        assert_eq!(value["firstName"], "Ty");
        assert_eq!(value["emailAddresses"][0]["emailAddress"], "ty@example.com");
    }
}
