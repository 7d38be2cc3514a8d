use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::auth::{self, AppState};
use crate::middleware::{require_api_key, require_auth};
use crate::{chirps, metrics, users, webhooks};

/// All Chirpy routes. CORS and request tracing are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/healthz", get(metrics::healthz))
        .route("/admin/metrics", get(metrics::metrics))
        .route("/api/reset", get(metrics::reset))
        .route("/api/users", post(users::create_user))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route("/api/chirps", get(chirps::list_chirps))
        .route("/api/chirps/{chirp_id}", get(chirps::get_chirp))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/users", put(users::update_user))
        .route("/api/chirps", post(chirps::create_chirp))
        .route("/api/chirps/{chirp_id}", delete(chirps::delete_chirp))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let webhook_routes = Router::new()
        .route("/api/polka/webhooks", post(webhooks::polka_webhook))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state.clone());

    let static_routes = Router::new()
        .nest_service("/app", ServeDir::new(&state.config.static_dir))
        .route_layer(middleware::from_fn_with_state(state, metrics::count_hits));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(webhook_routes)
        .merge(static_routes)
}
