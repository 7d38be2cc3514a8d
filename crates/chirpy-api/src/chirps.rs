use std::sync::LazyLock;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use chirpy_types::Error;
use chirpy_types::api::CreateChirpRequest;
use chirpy_types::models::{Chirp, ChirpId, SortOrder, UserId};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};
use crate::extract::ApiJson;
use crate::tokens::Claims;

pub const MAX_CHIRP_LENGTH: usize = 140;

const REPLACEMENT: &str = "****";

static PROFANITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(kerfuffle|sharbert|fornax)\b").expect("profanity pattern is valid")
});

#[derive(Debug, Deserialize)]
pub struct ChirpQuery {
    pub author_id: Option<UserId>,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Mask banned words, matched case-insensitively as whole words.
pub fn clean_body(body: &str) -> String {
    PROFANITY.replace_all(body, REPLACEMENT).into_owned()
}

/// Filter then length-check a chirp body (1 to 140 characters).
pub fn prepare_body(body: &str) -> chirpy_types::Result<String> {
    let cleaned = clean_body(body);
    match cleaned.chars().count() {
        0 => Err(Error::validation("chirp is too short")),
        n if n > MAX_CHIRP_LENGTH => Err(Error::validation("chirp is too long")),
        _ => Ok(cleaned),
    }
}

pub async fn create_chirp(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateChirpRequest>,
) -> ApiResult<(StatusCode, Json<Chirp>)> {
    let author_id = claims.user_id()?;
    let body = prepare_body(&req.body)?;

    let db = state.db.clone();
    let chirp = blocking(move || db.create_chirp(&body, author_id)).await?;

    Ok((StatusCode::CREATED, Json(chirp)))
}

/// `?author_id=` narrows to one author; `?sort=asc|desc` orders by id.
pub async fn list_chirps(
    State(state): State<AppState>,
    Query(query): Query<ChirpQuery>,
) -> ApiResult<Json<Vec<Chirp>>> {
    let db = state.db.clone();
    let chirps = blocking(move || match query.author_id {
        Some(author_id) => {
            let mut chirps = db.list_chirps_by_author(author_id)?;
            if query.sort == SortOrder::Descending {
                chirps.reverse();
            }
            Ok(chirps)
        }
        None => db.list_chirps(query.sort),
    })
    .await?;

    Ok(Json(chirps))
}

pub async fn get_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<ChirpId>,
) -> ApiResult<Json<Chirp>> {
    let db = state.db.clone();
    let chirp = blocking(move || db.get_chirp(chirp_id)).await?;
    Ok(Json(chirp))
}

/// Only the author may delete a chirp. The store itself does not check.
pub async fn delete_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<ChirpId>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    let requester = claims.user_id()?;

    let db = state.db.clone();
    blocking(move || {
        let chirp = db.get_chirp(chirp_id)?;
        if chirp.author_id != requester {
            warn!(
                "User {} tried to delete chirp {} owned by {}",
                requester, chirp_id, chirp.author_id
            );
            return Err(Error::forbidden("you are not allowed to delete this chirp"));
        }
        db.delete_chirp(chirp_id)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
