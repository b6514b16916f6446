use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateItemRequest, ItemView, ItemsOverview, UpdateItemRequest},
    repo::{self, Item},
};
use crate::{
    communities::services::check_shared_with,
    discover::{self, rules::available_items},
    error::{AppError, AppResult},
    leases,
    state::AppState,
    validation::clean_name,
};

/// Item visible to the caller: their own, or one shared into a common community.
pub async fn visible_item(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Item> {
    let item = repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))?;
    if item.owner_id == user_id {
        return Ok(item);
    }
    let graph = discover::repo::load_graph(&st.db, user_id).await?;
    if graph.visible_to(user_id, std::slice::from_ref(&item)).is_empty() {
        return Err(AppError::not_found("Item not found"));
    }
    Ok(item)
}

async fn owned_item(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Item> {
    let item = visible_item(st, id, user_id).await?;
    if item.owner_id != user_id {
        warn!(item_id = %id, %user_id, "non-owner tried to modify item");
        return Err(AppError::forbidden("Only the item owner can do this"));
    }
    Ok(item)
}

/// Active items of community peers the caller could borrow at `now`.
pub async fn discover(st: &AppState, user_id: Uuid, now: OffsetDateTime) -> AppResult<Vec<Item>> {
    let graph = discover::repo::load_graph(&st.db, user_id).await?;
    let peers: Vec<Uuid> = graph.peers_of(user_id).into_iter().collect();
    let candidates = repo::list_active_by_owners(&st.db, &peers).await?;
    let ids: Vec<Uuid> = candidates.iter().map(|i| i.id).collect();
    let blocking = leases::repo::blocking_ends(&st.db, &ids, now).await?;

    Ok(available_items(&graph, user_id, &candidates, &blocking, now)
        .into_iter()
        .cloned()
        .collect())
}

pub async fn overview(st: &AppState, user_id: Uuid, now: OffsetDateTime) -> AppResult<ItemsOverview> {
    let owned = repo::list_owned(&st.db, user_id).await?;
    let leases = leases::services::list(st, user_id).await?;
    let discover = discover(st, user_id, now).await?;
    Ok(ItemsOverview {
        owned: owned.into_iter().map(ItemView::from).collect(),
        leased: leases.leased,
        leased_out: leases.leased_out,
        discover: discover.into_iter().map(ItemView::from).collect(),
    })
}

pub async fn create(st: &AppState, owner_id: Uuid, req: CreateItemRequest) -> AppResult<Item> {
    let name = clean_name(&req.name)?;
    let shared_with = check_shared_with(&st.db, owner_id, &req.shared_with).await?;
    let id = repo::create(&st.db, owner_id, &name, req.item_type, &shared_with).await?;
    info!(item_id = %id, %owner_id, "item created");
    repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))
}

pub async fn update(
    st: &AppState,
    id: Uuid,
    user_id: Uuid,
    req: UpdateItemRequest,
) -> AppResult<Item> {
    let current = owned_item(st, id, user_id).await?;
    let name = match req.name.as_deref() {
        Some(raw) => clean_name(raw)?,
        None => current.name,
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
        req.item_type.unwrap_or(current.item_type),
        shared_with.as_deref(),
    )
    .await?;
    info!(item_id = %id, "item updated");
    repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))
}

pub async fn delete(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<()> {
    owned_item(st, id, user_id).await?;
    repo::delete(&st.db, id).await?;
    info!(item_id = %id, "item deleted");
    Ok(())
}
