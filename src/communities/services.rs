use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::User,
    communities::{
        dto::{CommunityDetail, CommunityLists},
        repo::{self, Community},
    },
    config::AppConfig,
    error::{AppError, AppResult},
    validation::{clean_name, subset_of},
};

/// Community the caller belongs to. Outsiders get 404 so existence does not leak.
pub async fn visible_community(db: &PgPool, id: Uuid, user_id: Uuid) -> AppResult<Community> {
    let community = repo::find(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Community not found"))?;
    if !repo::is_member(db, id, user_id).await? {
        return Err(AppError::not_found("Community not found"));
    }
    Ok(community)
}

/// Community the caller owns.
pub async fn owned_community(db: &PgPool, id: Uuid, user_id: Uuid) -> AppResult<Community> {
    let community = visible_community(db, id, user_id).await?;
    if community.owner_id != user_id {
        warn!(community_id = %id, %user_id, "non-owner tried to manage community");
        return Err(AppError::forbidden("Only the community owner can do this"));
    }
    Ok(community)
}

/// `requested` must name active communities the caller is a member of.
pub async fn check_shared_with(
    db: &PgPool,
    user_id: Uuid,
    requested: &[Uuid],
) -> AppResult<Vec<Uuid>> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }
    let mine = repo::active_community_ids(db, user_id).await?;
    subset_of(requested, &mine, "Community")
}

pub async fn list(db: &PgPool, user_id: Uuid) -> AppResult<CommunityLists> {
    let owned = repo::list_owned(db, user_id).await?;
    let joined = repo::list_joined(db, user_id).await?;
    Ok(CommunityLists {
        owned: owned.into_iter().map(Into::into).collect(),
        joined: joined.into_iter().map(Into::into).collect(),
    })
}

pub async fn create(db: &PgPool, owner_id: Uuid, raw_name: &str) -> AppResult<Community> {
    let name = clean_name(raw_name)?;
    let community = repo::create(db, owner_id, &name).await?;
    info!(community_id = %community.id, %owner_id, "community created");
    Ok(community)
}

pub async fn detail(
    db: &PgPool,
    config: &AppConfig,
    id: Uuid,
    user_id: Uuid,
) -> AppResult<CommunityDetail> {
    let community = visible_community(db, id, user_id).await?;
    let members = repo::members(db, id).await?;
    let (shared_items_count, shared_subscriptions_count) = repo::shared_counts(db, id).await?;

    Ok(CommunityDetail {
        id: community.id,
        community_name: community.name,
        is_active: community.is_active,
        invite_link: config.community_join_link(community.invite_token),
        created_by: community.owner_username,
        member_count: members.len() as i64,
        shared_items_count,
        shared_subscriptions_count,
        members: members.into_iter().map(Into::into).collect(),
    })
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
    name: Option<&str>,
    is_active: Option<bool>,
) -> AppResult<Community> {
    let current = owned_community(db, id, user_id).await?;
    let name = match name {
        Some(raw) => clean_name(raw)?,
        None => current.name,
    };
    repo::update(db, id, &name, is_active.unwrap_or(current.is_active)).await?;
    repo::find(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Community not found"))
}

pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> AppResult<()> {
    owned_community(db, id, user_id).await?;
    repo::delete(db, id).await?;
    info!(community_id = %id, "community deleted");
    Ok(())
}

/// Owner adds an existing account by username. Adding a current member is a no-op.
pub async fn add_member_by_username(
    db: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    username: &str,
) -> AppResult<()> {
    owned_community(db, id, owner_id).await?;
    let username = username.trim().to_lowercase();
    let user = User::find_by_username(db, &username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if repo::add_member(db, id, user.id).await? {
        info!(community_id = %id, member_id = %user.id, "member added");
    }
    Ok(())
}

pub async fn remove_member(db: &PgPool, id: Uuid, owner_id: Uuid, member_id: Uuid) -> AppResult<()> {
    let community = owned_community(db, id, owner_id).await?;
    if member_id == community.owner_id {
        return Err(AppError::bad_request("The owner cannot be removed from their community"));
    }
    if !repo::remove_member(db, id, member_id).await? {
        return Err(AppError::not_found("Member not found"));
    }
    info!(community_id = %id, %member_id, "member removed");
    Ok(())
}

pub async fn leave(db: &PgPool, id: Uuid, user_id: Uuid) -> AppResult<()> {
    let community = visible_community(db, id, user_id).await?;
    if community.owner_id == user_id {
        return Err(AppError::bad_request(
            "The owner cannot leave; delete the community instead",
        ));
    }
    repo::remove_member(db, id, user_id).await?;
    info!(community_id = %id, %user_id, "member left");
    Ok(())
}

/// Join through the community's standing token. Does not expire.
pub async fn join_by_token(db: &PgPool, token: Uuid, user_id: Uuid) -> AppResult<Community> {
    let community = repo::find_by_invite_token(db, token)
        .await?
        .ok_or_else(|| AppError::not_found("Invalid invite link"))?;
    if !community.is_active {
        return Err(AppError::bad_request("This community is no longer active"));
    }
    if repo::add_member(db, community.id, user_id).await? {
        info!(community_id = %community.id, %user_id, "joined via community link");
    }
    Ok(community)
}

pub async fn rotate_invite_token(
    db: &PgPool,
    config: &AppConfig,
    id: Uuid,
    owner_id: Uuid,
) -> AppResult<String> {
    owned_community(db, id, owner_id).await?;
    let token = repo::rotate_invite_token(db, id).await?;
    info!(community_id = %id, "invite token rotated");
    Ok(config.community_join_link(token))
}
