use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use chirpy_types::{Error, Result};

use crate::auth::AppState;
use crate::error::ApiError;

/// Pull `<token>` out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    authorization_credential(headers, "bearer")
}

/// Pull `<key>` out of `Authorization: ApiKey <key>`.
pub fn api_key(headers: &HeaderMap) -> Result<&str> {
    authorization_credential(headers, "apikey")
}

/// The header must be exactly `<scheme> <credential>`; the scheme is matched
/// case-insensitively.
fn authorization_credential<'a>(headers: &'a HeaderMap, scheme: &str) -> Result<&'a str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::auth("missing Authorization header"))?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(s), Some(credential), None)
            if s.eq_ignore_ascii_case(scheme) && !credential.is_empty() =>
        {
            Ok(credential)
        }
        _ => Err(Error::auth("invalid Authorization header format")),
    }
}

/// Validate the bearer access token and stash its claims in the request
/// extensions for the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;
    let claims = state.tokens.validate_access_token(token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Gate the payment webhook on the configured `ApiKey`. Runs before the body
/// is read, so an unauthenticated caller learns nothing about the payload.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let key = api_key(req.headers())?;
    if state.config.polka_api_key.as_deref() != Some(key) {
        warn!("Rejected webhook with an unknown API key");
        return Err(Error::auth("invalid API key").into());
    }

    Ok(next.run(req).await)
}
