use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateItemRequest, ItemView, ItemsOverview, UpdateItemRequest},
    services,
};
use crate::{auth::AuthUser, error::AppResult, leases::dto::LeaseView, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/items/:id/leases", get(item_leases))
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<ItemsOverview>> {
    Ok(Json(
        services::overview(&state, user_id, OffsetDateTime::now_utc()).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ItemView>)> {
    let item = services::create(&state, user_id, body).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ItemView>> {
    Ok(Json(services::visible_item(&state, id, user_id).await?.into()))
}

#[instrument(skip(state, body))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateItemRequest>,
) -> AppResult<Json<ItemView>> {
    let item = services::update(&state, id, user_id, body).await?;
    Ok(Json(item.into()))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Booked windows of an item, so a borrower can pick a free slot.
#[instrument(skip(state))]
pub async fn item_leases(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<LeaseView>>> {
    let item = services::visible_item(&state, id, user_id).await?;
    let leases = crate::leases::repo::list_for_item(&state.db, item.id).await?;
    Ok(Json(leases.into_iter().map(Into::into).collect()))
}
