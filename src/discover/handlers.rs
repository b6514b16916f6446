use axum::{extract::State, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    dto::{Dashboard, DiscoverResponse},
    services,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/discover", get(discover))
        .route("/dashboard", get(dashboard))
}

#[instrument(skip(state))]
pub async fn discover(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<DiscoverResponse>> {
    Ok(Json(
        services::discover(&state, user_id, OffsetDateTime::now_utc()).await?,
    ))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Dashboard>> {
    Ok(Json(
        services::dashboard(&state, user_id, OffsetDateTime::now_utc()).await?,
    ))
}
