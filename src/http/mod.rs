//! HTTP surface: `/restaurants` and `/restaurants/{id}`.

use axum::{Router, routing::get};

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::ValidJson;

use crate::service::RestaurantService;
use routes::{create_handler, delete_handler, get_handler, list_handler, replace_handler};

#[derive(Clone)]
pub struct AppState {
    pub service: RestaurantService,
}

pub fn router(service: RestaurantService) -> Router {
    Router::new()
        .route("/restaurants", get(list_handler).post(create_handler))
        .route(
            "/restaurants/{id}",
            get(get_handler).put(replace_handler).delete(delete_handler),
        )
        .with_state(AppState { service })
}
