use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod adverts;
pub mod auth;
pub mod capture;
pub mod doc;
pub mod health;
pub mod params;
pub mod payments;
pub mod plans;
pub mod products;
pub mod recipes;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/plans", plans::router())
        .nest("/payments", payments::router())
        .nest("/recipes", recipes::router())
        .nest("/capture", capture::router())
        .nest("/adverts", adverts::router())
        .nest("/admin", admin::router())
}
