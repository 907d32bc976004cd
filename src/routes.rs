use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};

use crate::handlers;
use crate::middleware::{is_logged_in, protect, require_role, restrict_to};
use crate::models::Role;
use crate::state::AppState;

/// Build the application router
///
/// Layers added with `route_layer` run last-added first, so on the admin
/// routes `protect` runs before the role check.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/v1/users/signup", post(handlers::signup))
        .route("/api/v1/users/login", post(handlers::login))
        .route("/api/v1/users/logout", get(handlers::logout))
        .route("/api/v1/users/forgotPassword", post(handlers::forgot_password))
        .route(
            "/api/v1/users/resetPassword/{token}",
            patch(handlers::reset_password),
        );

    let protected = Router::new()
        .route(
            "/api/v1/users/updateMyPassword",
            patch(handlers::update_my_password),
        )
        .route("/api/v1/users/me", get(handlers::get_me))
        .route_layer(from_fn_with_state(state.clone(), protect));

    let admin = Router::new()
        .route("/api/v1/users/{id}", get(handlers::get_user))
        .route_layer(from_fn_with_state(restrict_to(&[Role::Admin]), require_role))
        .route_layer(from_fn_with_state(state.clone(), protect));

    let viewer = Router::new()
        .route("/api/v1/viewer", get(handlers::viewer))
        .route_layer(from_fn_with_state(state.clone(), is_logged_in));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .merge(viewer)
        .with_state(state)
}
