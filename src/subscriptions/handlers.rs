use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        CreateSubscriptionRequest, SubscriptionLists, SubscriptionView, UpdateSubscriptionRequest,
    },
    services,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(get_subscription)
                .patch(update_subscription)
                .delete(delete_subscription),
        )
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<SubscriptionLists>> {
    Ok(Json(services::list(&state, user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<SubscriptionView>)> {
    let sub = services::create(&state, user_id, body).await?;
    Ok((StatusCode::CREATED, Json(sub.into())))
}

#[instrument(skip(state))]
pub async fn get_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubscriptionView>> {
    Ok(Json(
        services::visible_subscription(&state, id, user_id).await?.into(),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSubscriptionRequest>,
) -> AppResult<Json<SubscriptionView>> {
    let sub = services::update(&state, id, user_id, body).await?;
    Ok(Json(sub.into()))
}

#[instrument(skip(state))]
pub async fn delete_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
