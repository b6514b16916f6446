use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{BorrowRequest, CreateLeaseRequest, LeaseLists, LeaseView, UpdateLeaseRequest},
    services,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leases", get(list_leases).post(create_lease))
        .route(
            "/leases/:id",
            get(get_lease).patch(update_lease).delete(delete_lease),
        )
        .route("/items/:id/borrow", post(borrow_item))
}

#[instrument(skip(state))]
pub async fn list_leases(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<LeaseLists>> {
    Ok(Json(services::list(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn create_lease(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateLeaseRequest>,
) -> AppResult<(StatusCode, Json<LeaseView>)> {
    let lease = services::create_lease(
        &state,
        user_id,
        body.item_id,
        body.lessee_id,
        body.start_date,
        body.end_date,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(lease.into())))
}

#[instrument(skip(state))]
pub async fn borrow_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<Uuid>,
    Json(body): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<LeaseView>)> {
    let lease =
        services::borrow_item(&state, user_id, item_id, body.start_date, body.end_date).await?;
    Ok((StatusCode::CREATED, Json(lease.into())))
}

#[instrument(skip(state))]
pub async fn get_lease(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LeaseView>> {
    Ok(Json(services::get_lease(&state, user_id, id).await?.into()))
}

#[instrument(skip(state))]
pub async fn update_lease(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLeaseRequest>,
) -> AppResult<Json<LeaseView>> {
    let lease = services::update_lease(&state, user_id, id, body).await?;
    Ok(Json(lease.into()))
}

#[instrument(skip(state))]
pub async fn delete_lease(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_lease(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
