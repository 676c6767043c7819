//! HTTP surface: Pub/Sub push endpoint and health check

pub mod health;
pub mod push;

use axum::{Router, routing};

use crate::SharedState;

pub use health::root;
pub use push::handle_push;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root).post(handle_push))
        .with_state(state)
}
