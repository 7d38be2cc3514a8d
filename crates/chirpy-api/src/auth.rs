use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use chrono::Duration;
use tracing::info;

use chirpy_db::Database;
use chirpy_types::api::{LoginRequest, LoginResponse, RefreshResponse};
use chirpy_types::Error;

use crate::error::{ApiResult, blocking};
use crate::extract::ApiJson;
use crate::middleware::bearer_token;
use crate::tokens::{TokenConfig, TokenService};

pub type AppState = Arc<AppStateInner>;

/// Settings the HTTP layer needs beyond token signing.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Lifetime of access tokens handed out by login and refresh.
    pub access_token_ttl: Duration,
    /// Key the payment provider presents on webhooks. `None` rejects them all.
    pub polka_api_key: Option<String>,
    /// Directory served under `/app`.
    pub static_dir: PathBuf,
}

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub tokens: TokenService,
    pub config: ApiConfig,
    pub file_server_hits: AtomicUsize,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, token_config: TokenConfig, config: ApiConfig) -> AppState {
        Arc::new(Self {
            tokens: TokenService::new(token_config, db.clone()),
            db,
            config,
            file_server_hits: AtomicUsize::new(0),
        })
    }

    /// A client may ask for a shorter-lived access token, never a longer one.
    pub fn access_token_ttl(&self, requested_secs: Option<i64>) -> Duration {
        let max = self.config.access_token_ttl;
        match requested_secs {
            Some(secs) if secs > 0 && secs <= max.num_seconds() => Duration::seconds(secs),
            _ => max,
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let ttl = state.access_token_ttl(req.expires_in_seconds);

    let db = state.db.clone();
    let user = blocking(move || {
        // Unknown email and wrong password look the same to the caller.
        let user = match db.get_user_by_email(&req.email) {
            Ok(user) => user,
            Err(Error::NotFound(_)) => return Err(Error::auth("invalid credentials")),
            Err(e) => return Err(e),
        };
        chirpy_crypto::verify_password(&user.password_hash, &req.password)?;
        Ok(user)
    })
    .await?;

    let token = state.tokens.issue_access_token(user.id, Some(ttl))?;
    let refresh_token = state.tokens.issue_refresh_token(user.id)?;

    info!("User {} logged in", user.id);
    Ok(Json(LoginResponse {
        id: user.id,
        email: user.email,
        is_chirpy_red: user.is_premium,
        token,
        refresh_token,
    }))
}

/// Trade a refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<RefreshResponse>> {
    let token = bearer_token(&headers)?.to_string();

    let st = state.clone();
    let claims = blocking(move || st.tokens.validate_refresh_token(&token)).await?;
    let user_id = claims.user_id()?;

    let token = state
        .tokens
        .issue_access_token(user_id, Some(state.config.access_token_ttl))?;
    Ok(Json(RefreshResponse { token }))
}

pub async fn revoke(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let token = bearer_token(&headers)?.to_string();

    let st = state.clone();
    blocking(move || {
        let claims = st.tokens.validate_refresh_token(&token)?;
        st.tokens.revoke_refresh_token(&token)?;
        info!("User {} revoked a refresh token", claims.sub);
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
