use axum::{Extension, Json, extract::State, http::StatusCode};
use tracing::info;

use chirpy_types::Error;
use chirpy_types::api::{CredentialsRequest, UserResponse};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};
use crate::extract::ApiJson;
use crate::tokens::Claims;

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let db = state.db.clone();
    let user = blocking(move || db.create_user(&req.email, &req.password)).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Replace the caller's email and password.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user_id = claims.user_id()?;
    if req.email.is_empty() {
        return Err(Error::validation("email required").into());
    }
    if req.password.is_empty() {
        return Err(Error::validation("password required").into());
    }

    let db = state.db.clone();
    let user = blocking(move || {
        let mut user = db.get_user_by_id(user_id)?;
        user.email = req.email;
        user.password_hash = chirpy_crypto::hash_password(&req.password)?;
        db.update_user(&user)?;
        Ok(user)
    })
    .await?;

    info!("User {} updated their credentials", user.id);
    Ok(Json(UserResponse::from(&user)))
}
