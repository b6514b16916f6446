use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        AddMemberRequest, CommunityDetail, CommunityLists, CommunitySummary,
        CreateCommunityRequest, InviteLinkResponse, UpdateCommunityRequest,
    },
    services,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/communities", get(list_communities).post(create_community))
        .route(
            "/communities/:id",
            get(get_community)
                .patch(update_community)
                .delete(delete_community),
        )
        .route("/communities/:id/members", post(add_member))
        .route("/communities/:id/members/:user_id", delete(remove_member))
        .route("/communities/:id/leave", post(leave_community))
        .route("/communities/:id/invite-token", post(rotate_invite_token))
        .route("/join/:token", post(join_community))
}

#[instrument(skip(state))]
pub async fn list_communities(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<CommunityLists>> {
    Ok(Json(services::list(&state.db, user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_community(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateCommunityRequest>,
) -> AppResult<(StatusCode, Json<CommunitySummary>)> {
    let community = services::create(&state.db, user_id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(community.into())))
}

#[instrument(skip(state))]
pub async fn get_community(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CommunityDetail>> {
    Ok(Json(
        services::detail(&state.db, &state.config, id, user_id).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn update_community(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCommunityRequest>,
) -> AppResult<Json<CommunitySummary>> {
    let community =
        services::update(&state.db, id, user_id, body.name.as_deref(), body.is_active).await?;
    Ok(Json(community.into()))
}

#[instrument(skip(state))]
pub async fn delete_community(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state.db, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> AppResult<StatusCode> {
    services::add_member_by_username(&state.db, id, user_id, &body.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn remove_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::remove_member(&state.db, id, user_id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn leave_community(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::leave(&state.db, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn rotate_invite_token(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InviteLinkResponse>> {
    let invite_link = services::rotate_invite_token(&state.db, &state.config, id, user_id).await?;
    Ok(Json(InviteLinkResponse { invite_link }))
}

#[instrument(skip(state))]
pub async fn join_community(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(token): Path<Uuid>,
) -> AppResult<Json<CommunitySummary>> {
    let community = services::join_by_token(&state.db, token, user_id).await?;
    Ok(Json(community.into()))
}
