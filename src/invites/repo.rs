use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::model::Invite;

const INVITE_COLUMNS: &str =
    "id, community_id, token, created_by, created_at, used_by, used_at, is_used";

pub async fn create(db: &PgPool, community_id: Uuid, created_by: Uuid) -> anyhow::Result<Invite> {
    let invite = sqlx::query_as::<_, Invite>(&format!(
        r#"
        INSERT INTO invites (community_id, created_by)
        VALUES ($1, $2)
        RETURNING {INVITE_COLUMNS}
        "#
    ))
    .bind(community_id)
    .bind(created_by)
    .fetch_one(db)
    .await
    .context("insert invite")?;
    Ok(invite)
}

pub async fn find_by_token(db: &PgPool, token: Uuid) -> anyhow::Result<Option<Invite>> {
    let invite = sqlx::query_as::<_, Invite>(&format!(
        "SELECT {INVITE_COLUMNS} FROM invites WHERE token = $1"
    ))
    .bind(token)
    .fetch_optional(db)
    .await
    .context("find invite by token")?;
    Ok(invite)
}

/// Row-locks the invite so concurrent redemptions serialize.
pub async fn lock_by_token_tx(
    tx: &mut Transaction<'_, Postgres>,
    token: Uuid,
) -> anyhow::Result<Option<Invite>> {
    let invite = sqlx::query_as::<_, Invite>(&format!(
        "SELECT {INVITE_COLUMNS} FROM invites WHERE token = $1 FOR UPDATE"
    ))
    .bind(token)
    .fetch_optional(&mut **tx)
    .await
    .context("lock invite")?;
    Ok(invite)
}

pub async fn mark_used_tx(tx: &mut Transaction<'_, Postgres>, invite: &Invite) -> anyhow::Result<()> {
    sqlx::query("UPDATE invites SET is_used = $2, used_by = $3, used_at = $4 WHERE id = $1")
        .bind(invite.id)
        .bind(invite.is_used)
        .bind(invite.used_by)
        .bind(invite.used_at)
        .execute(&mut **tx)
        .await
        .context("mark invite used")?;
    Ok(())
}

pub async fn list_for_community(db: &PgPool, community_id: Uuid) -> anyhow::Result<Vec<Invite>> {
    let rows = sqlx::query_as::<_, Invite>(&format!(
        "SELECT {INVITE_COLUMNS} FROM invites WHERE community_id = $1 ORDER BY created_at DESC"
    ))
    .bind(community_id)
    .fetch_all(db)
    .await
    .context("list invites")?;
    Ok(rows)
}
