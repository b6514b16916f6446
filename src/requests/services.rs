use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateRequestRequest, RequestLists, RequestView, UpdateRequestRequest},
    repo::{self, Request},
};
use crate::{
    communities::services::check_shared_with,
    discover,
    error::{AppError, AppResult},
    state::AppState,
    validation::clean_name,
};

pub async fn visible_request(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Request> {
    let request = repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Request not found"))?;
    if request.owner_id == user_id {
        return Ok(request);
    }
    let graph = discover::repo::load_graph(&st.db, user_id).await?;
    if graph.visible_to(user_id, std::slice::from_ref(&request)).is_empty() {
        return Err(AppError::not_found("Request not found"));
    }
    Ok(request)
}

async fn owned_request(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Request> {
    let request = visible_request(st, id, user_id).await?;
    if request.owner_id != user_id {
        warn!(request_id = %id, %user_id, "non-owner tried to modify request");
        return Err(AppError::forbidden("Only the request owner can do this"));
    }
    Ok(request)
}

/// Open requests of peers that reach one of the caller's communities.
pub async fn open_requests(st: &AppState, user_id: Uuid) -> AppResult<Vec<Request>> {
    let graph = discover::repo::load_graph(&st.db, user_id).await?;
    let peers: Vec<Uuid> = graph.peers_of(user_id).into_iter().collect();
    let candidates = repo::list_open_by_owners(&st.db, &peers).await?;
    Ok(graph
        .visible_to(user_id, &candidates)
        .into_iter()
        .cloned()
        .collect())
}

pub async fn list(st: &AppState, user_id: Uuid) -> AppResult<RequestLists> {
    let owned = repo::list_owned(&st.db, user_id).await?;
    let community = open_requests(st, user_id).await?;
    Ok(RequestLists {
        owned: owned.into_iter().map(RequestView::from).collect(),
        community: community.into_iter().map(RequestView::from).collect(),
    })
}

pub async fn create(st: &AppState, owner_id: Uuid, req: CreateRequestRequest) -> AppResult<Request> {
    let name = clean_name(&req.name)?;
    let shared_with = check_shared_with(&st.db, owner_id, &req.shared_with).await?;
    let id = repo::create(&st.db, owner_id, &name, req.request_type, &shared_with).await?;
    info!(request_id = %id, %owner_id, "request created");
    repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Request not found"))
}

pub async fn update(
    st: &AppState,
    id: Uuid,
    user_id: Uuid,
    req: UpdateRequestRequest,
) -> AppResult<Request> {
    let current = owned_request(st, id, user_id).await?;
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
        req.request_type.unwrap_or(current.request_type),
        shared_with.as_deref(),
    )
    .await?;
    info!(request_id = %id, "request updated");
    repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Request not found"))
}

/// Marks a request fulfilled, or reopens it.
pub async fn set_completed(
    st: &AppState,
    id: Uuid,
    user_id: Uuid,
    completed: bool,
) -> AppResult<Request> {
    let mut request = owned_request(st, id, user_id).await?;
    if request.is_completed != completed {
        repo::set_completed(&st.db, id, completed).await?;
        info!(request_id = %id, completed, "request completion changed");
        request.is_completed = completed;
    }
    Ok(request)
}

pub async fn delete(st: &AppState, id: Uuid, user_id: Uuid) -> AppResult<()> {
    owned_request(st, id, user_id).await?;
    repo::delete(&st.db, id).await?;
    info!(request_id = %id, "request deleted");
    Ok(())
}
