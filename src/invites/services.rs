use anyhow::Context;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{InviteCreated, InvitePreview, InviteView},
    model::InviteError,
    repo,
};
use crate::{
    communities::{self, repo::Community},
    error::{AppError, AppResult},
    state::AppState,
};

pub async fn create_invite(st: &AppState, community_id: Uuid, owner_id: Uuid) -> AppResult<InviteCreated> {
    let community = communities::services::owned_community(&st.db, community_id, owner_id).await?;
    if !community.is_active {
        return Err(InviteError::CommunityInactive.into());
    }

    let invite = repo::create(&st.db, community.id, owner_id).await?;
    info!(community_id = %community.id, invite_id = %invite.id, "invite created");

    Ok(InviteCreated {
        token: invite.token,
        community_id: community.id,
        invite_url: st.config.invite_link(invite.token),
        expires_at: invite.expires_at(st.config.invite_ttl()),
    })
}

pub async fn list_invites(st: &AppState, community_id: Uuid, owner_id: Uuid, now: OffsetDateTime) -> AppResult<Vec<InviteView>> {
    communities::services::owned_community(&st.db, community_id, owner_id).await?;
    let ttl = st.config.invite_ttl();
    let invites = repo::list_for_community(&st.db, community_id).await?;
    Ok(invites
        .into_iter()
        .map(|i| InviteView {
            token: i.token,
            state: i.state(now, ttl),
            used_by: i.used_by,
            used_at: i.used_at,
            created_at: i.created_at,
        })
        .collect())
}

pub async fn preview(st: &AppState, token: Uuid, now: OffsetDateTime) -> AppResult<InvitePreview> {
    let invite = repo::find_by_token(&st.db, token)
        .await?
        .ok_or(InviteError::NotFound)?;
    let community = load_community(st, invite.community_id).await?;
    let ttl = st.config.invite_ttl();

    Ok(InvitePreview {
        community_id: community.id,
        community_name: community.name,
        invited_by: community.owner_username,
        state: invite.state(now, ttl),
        expires_at: invite.expires_at(ttl),
    })
}

/// Redeem `token` for `user_id`. The invite row stays locked until membership is written.
pub async fn accept(st: &AppState, token: Uuid, user_id: Uuid, now: OffsetDateTime) -> AppResult<Community> {
    let mut tx = st.db.begin().await.context("begin tx")?;

    let mut invite = repo::lock_by_token_tx(&mut tx, token)
        .await?
        .ok_or(InviteError::NotFound)?;
    let community = load_community(st, invite.community_id).await?;
    if !community.is_active {
        return Err(InviteError::CommunityInactive.into());
    }

    if communities::repo::is_member(&st.db, community.id, user_id).await? {
        // Nothing to grant; keep the invite for someone else.
        invite.check_usable(now, st.config.invite_ttl())?;
        return Ok(community);
    }

    if let Err(e) = invite.redeem(user_id, now, st.config.invite_ttl()) {
        warn!(invite_id = %invite.id, %user_id, error = %e, "invite rejected");
        return Err(e.into());
    }
    repo::mark_used_tx(&mut tx, &invite).await?;
    communities::repo::add_member(&mut *tx, community.id, user_id).await?;
    tx.commit().await.context("commit tx")?;

    info!(invite_id = %invite.id, community_id = %community.id, %user_id, "invite accepted");
    Ok(community)
}

async fn load_community(st: &AppState, id: Uuid) -> AppResult<Community> {
    communities::repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Community not found"))
}
