use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateSubscriptionRequest, SubscriptionLists, SubscriptionView, UpdateSubscriptionRequest,
    },
    repo::{self, Subscription},
};
use crate::{
    communities::services::check_shared_with,
    discover::{self, rules::available_subscriptions},
    error::{AppError, AppResult},
    state::AppState,
    validation::{clean_name, subset_of},
};

/// `requested` must name community peers of the caller.
async fn check_shared_to(st: &AppState, user_id: Uuid, requested: &[Uuid]) -> AppResult<Vec<Uuid>> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }
    let graph = discover::repo::load_graph(&st.db, user_id).await?;
    subset_of(requested, &graph.peers_of(user_id), "User")
}

/// Own subscriptions, ones shared to the caller directly, and ones shared into
/// a common community.
pub async fn visible_subscription(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Subscription> {
    let sub = repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription not found"))?;
    if sub.owner_id == user_id || (sub.is_active && sub.shared_to.contains(&user_id)) {
        return Ok(sub);
    }
    let graph = discover::repo::load_graph(&st.db, user_id).await?;
    if graph.visible_to(user_id, std::slice::from_ref(&sub)).is_empty() {
        return Err(AppError::not_found("Subscription not found"));
    }
    Ok(sub)
}

async fn owned_subscription(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Subscription> {
    let sub = visible_subscription(st, id, user_id).await?;
    if sub.owner_id != user_id {
        warn!(subscription_id = %id, %user_id, "non-owner tried to modify subscription");
        return Err(AppError::forbidden("Only the subscription owner can do this"));
    }
    Ok(sub)
}

/// Subscriptions of peers the caller could ask to join.
pub async fn discover(st: &AppState, user_id: Uuid) -> AppResult<Vec<Subscription>> {
    let graph = discover::repo::load_graph(&st.db, user_id).await?;
    let peers: Vec<Uuid> = graph.peers_of(user_id).into_iter().collect();
    let candidates = repo::list_active_by_owners(&st.db, &peers).await?;
    Ok(
        available_subscriptions(&graph, user_id, &candidates, |s| &s.shared_to)
            .into_iter()
            .cloned()
            .collect(),
    )
}

pub async fn list(st: &AppState, user_id: Uuid) -> AppResult<SubscriptionLists> {
    let owned = repo::list_owned(&st.db, user_id).await?;
    let shared = repo::list_shared_to(&st.db, user_id).await?;
    let discover = discover(st, user_id).await?;
    Ok(SubscriptionLists {
        owned: owned.into_iter().map(SubscriptionView::from).collect(),
        shared: shared.into_iter().map(SubscriptionView::from).collect(),
        discover: discover.into_iter().map(SubscriptionView::from).collect(),
    })
}

pub async fn create(
    st: &AppState,
    owner_id: Uuid,
    req: CreateSubscriptionRequest,
) -> AppResult<Subscription> {
    let name = clean_name(&req.name)?;
    let shared_to = check_shared_to(st, owner_id, &req.shared_to).await?;
    let shared_with = check_shared_with(&st.db, owner_id, &req.shared_with).await?;
    let id = repo::create(&st.db, owner_id, &name, &shared_to, &shared_with).await?;
    info!(subscription_id = %id, %owner_id, "subscription created");
    repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription not found"))
}

pub async fn update(
    st: &AppState,
    id: Uuid,
    user_id: Uuid,
    req: UpdateSubscriptionRequest,
) -> AppResult<Subscription> {
    let current = owned_subscription(st, id, user_id).await?;
    let name = match req.name.as_deref() {
        Some(raw) => clean_name(raw)?,
        None => current.name,
    };
    let shared_to = match req.shared_to.as_deref() {
        Some(requested) => Some(check_shared_to(st, user_id, requested).await?),
        None => None,
    };
    let shared_with = match req.shared_with.as_deref() {
        Some(requested) => Some(check_shared_with(&st.db, user_id, requested).await?),
        None => None,
    };

    repo::update(
        &st.db,
        id,
        &name,
        req.is_active.unwrap_or(current.is_active),
        shared_to.as_deref(),
        shared_with.as_deref(),
    )
    .await?;
    info!(subscription_id = %id, "subscription updated");
    repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription not found"))
}

pub async fn delete(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<()> {
    owned_subscription(st, id, user_id).await?;
    repo::delete(&st.db, id).await?;
    info!(subscription_id = %id, "subscription deleted");
    Ok(())
}
