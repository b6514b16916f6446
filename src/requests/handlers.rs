use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateRequestRequest, RequestLists, RequestView, UpdateRequestRequest},
    services,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_requests).post(create_request))
        .route(
            "/requests/:id",
            get(get_request).patch(update_request).delete(delete_request),
        )
        .route("/requests/:id/complete", post(complete_request))
        .route("/requests/:id/reopen", post(reopen_request))
}

#[instrument(skip(state))]
pub async fn list_requests(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<RequestLists>> {
    Ok(Json(services::list(&state, user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateRequestRequest>,
) -> AppResult<(StatusCode, Json<RequestView>)> {
    let request = services::create(&state, user_id, body).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

#[instrument(skip(state))]
pub async fn get_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RequestView>> {
    Ok(Json(services::visible_request(&state, id, user_id).await?.into()))
}

#[instrument(skip(state, body))]
pub async fn update_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRequestRequest>,
) -> AppResult<Json<RequestView>> {
    let request = services::update(&state, id, user_id, body).await?;
    Ok(Json(request.into()))
}

#[instrument(skip(state))]
pub async fn complete_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RequestView>> {
    let request = services::set_completed(&state, id, user_id, true).await?;
    Ok(Json(request.into()))
}

#[instrument(skip(state))]
pub async fn reopen_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RequestView>> {
    let request = services::set_completed(&state, id, user_id, false).await?;
    Ok(Json(request.into()))
}

#[instrument(skip(state))]
pub async fn delete_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
