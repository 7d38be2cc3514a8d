pub mod auth;
pub mod chirps;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod tokens;
pub mod users;
pub mod webhooks;
