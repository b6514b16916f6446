use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    dto::{Dashboard, DiscoverResponse},
    repo,
};
use crate::{
    auth::repo::owned_counts, error::AppResult, items, requests, state::AppState, subscriptions,
};

pub async fn discover(st: &AppState, user_id: Uuid, now: OffsetDateTime) -> AppResult<DiscoverResponse> {
    let items = items::services::discover(st, user_id, now).await?;
    let subscriptions = subscriptions::services::discover(st, user_id).await?;
    let requests = requests::services::open_requests(st, user_id).await?;
    Ok(DiscoverResponse {
        items: items.into_iter().map(Into::into).collect(),
        subscriptions: subscriptions.into_iter().map(Into::into).collect(),
        requests: requests.into_iter().map(Into::into).collect(),
    })
}

pub async fn dashboard(st: &AppState, user_id: Uuid, now: OffsetDateTime) -> AppResult<Dashboard> {
    let owned = owned_counts(&st.db, user_id).await?;
    let available_items = items::services::discover(st, user_id, now).await?.len() as i64;
    let available_subscriptions = subscriptions::services::discover(st, user_id).await?.len() as i64;

    let graph = repo::load_graph(&st.db, user_id).await?;
    let communities = graph.communities_of(user_id).count() as i64;
    let peers = graph.peers_of(user_id).len() as i64;

    Ok(Dashboard::new(
        owned,
        (available_items, available_subscriptions),
        communities,
        peers,
    ))
}
