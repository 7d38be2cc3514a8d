use axum::{extract::State, http::StatusCode};
use tracing::{debug, info};

use chirpy_types::api::{EVENT_USER_UPGRADED, PolkaWebhook};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};
use crate::extract::ApiJson;

/// Payment provider callback, mounted behind `require_api_key`. Only
/// `user.upgraded` changes anything; every other event is acknowledged and
/// dropped.
pub async fn polka_webhook(
    State(state): State<AppState>,
    ApiJson(hook): ApiJson<PolkaWebhook>,
) -> ApiResult<StatusCode> {
    if hook.event != EVENT_USER_UPGRADED {
        debug!("Ignoring webhook event {}", hook.event);
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id = hook.data.user_id;
    let db = state.db.clone();
    blocking(move || {
        let mut user = db.get_user_by_id(user_id)?;
        user.is_premium = true;
        db.update_user(&user)
    })
    .await?;

    info!("User {} upgraded to Chirpy Red", user_id);
    Ok(StatusCode::NO_CONTENT)
}
