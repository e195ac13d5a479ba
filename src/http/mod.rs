use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{ActorId, AdminToken};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::businesses())
        .merge(routes::messaging())
        .merge(routes::notifications())
        .merge(routes::admin())
        .with_state(state)
}
