//! Administrator endpoints, guarded by the admin API key.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::post, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/certifications", post(create_certification))
        .route("/admin/withdraw", post(withdraw))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
