use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{InviteCreated, InvitePreview, InviteView},
    services,
};
use crate::{
    auth::AuthUser, communities::dto::CommunitySummary, error::AppResult, state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/communities/:id/invites",
            post(send_invite).get(list_invites),
        )
        .route("/invites/:token", get(preview_invite).post(accept_invite))
}

#[instrument(skip(state))]
pub async fn send_invite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(community_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<InviteCreated>)> {
    let created = services::create_invite(&state, community_id, user_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state))]
pub async fn list_invites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(community_id): Path<Uuid>,
) -> AppResult<Json<Vec<InviteView>>> {
    let invites =
        services::list_invites(&state, community_id, user_id, OffsetDateTime::now_utc()).await?;
    Ok(Json(invites))
}

#[instrument(skip(state))]
pub async fn preview_invite(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(token): Path<Uuid>,
) -> AppResult<Json<InvitePreview>> {
    Ok(Json(
        services::preview(&state, token, OffsetDateTime::now_utc()).await?,
    ))
}

#[instrument(skip(state))]
pub async fn accept_invite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(token): Path<Uuid>,
) -> AppResult<Json<CommunitySummary>> {
    let community = services::accept(&state, token, user_id, OffsetDateTime::now_utc()).await?;
    Ok(Json(community.into()))
}
