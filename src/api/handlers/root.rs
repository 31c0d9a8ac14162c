use super::Message;
use axum::{response::IntoResponse, Json};

pub const ROOT_MESSAGE: &str = "Clerk Authentication";

// axum handler for root
pub async fn root() -> impl IntoResponse {
    Json(Message::new(ROOT_MESSAGE))
}
