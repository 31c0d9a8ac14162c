use crate::{
    api::error::{ApiError, ErrorBody},
    provider::{IdentityProvider, User, UserListQuery},
};
use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserList {
    pub users: Vec<User>,
}

#[utoipa::path(
    get,
    path= "/clients",
    params(UserListQuery),
    responses (
        (status = 200, description = "Registered users", body = UserList, content_type = "application/json"),
        (status = 500, description = "Identity provider failed", body = ErrorBody),
    ),
    tag= "users"
)]
// axum handler for listing users
#[instrument(skip(provider))]
pub async fn clients(
    provider: Extension<Arc<dyn IdentityProvider>>,
    query: Option<Query<UserListQuery>>,
) -> Result<Json<UserList>, ApiError> {
    // unparseable pagination falls back to the provider defaults
    let query = query.map(|Query(query)| query).unwrap_or_else(|| {
        debug!("Ignoring invalid pagination query");
        UserListQuery::default()
    });

    match provider.list_users(&query).await {
        Ok(users) => {
            debug!("Listed {} users", users.len());
            Ok(Json(UserList { users }))
        }
        Err(e) => {
            error!("Error listing users: {}", e);
            Err(e.into())
        }
    }
}
