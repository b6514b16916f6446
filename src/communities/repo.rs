use std::collections::BTreeSet;

use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub is_active: bool,
    pub invite_token: Uuid,
    pub created_at: OffsetDateTime,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

const COMMUNITY_SELECT: &str = r#"
    SELECT c.id, c.name, c.owner_id, u.username AS owner_username, c.is_active,
           c.invite_token, c.created_at,
           (SELECT COUNT(*) FROM community_members m WHERE m.community_id = c.id) AS member_count
      FROM communities c
      JOIN users u ON u.id = c.owner_id
"#;

/// Create a community and enrol its owner as the first member.
pub async fn create(db: &PgPool, owner_id: Uuid, name: &str) -> anyhow::Result<Community> {
    let mut tx = db.begin().await.context("begin tx")?;

    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO communities (name, owner_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(owner_id)
    .fetch_one(&mut *tx)
    .await
    .context("insert community")?;

    add_member(&mut *tx, id, owner_id).await?;
    tx.commit().await.context("commit tx")?;

    find(db, id)
        .await?
        .context("community vanished after insert")
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Community>> {
    let row = sqlx::query_as::<_, Community>(&format!("{COMMUNITY_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find community")?;
    Ok(row)
}

pub async fn find_by_invite_token(db: &PgPool, token: Uuid) -> anyhow::Result<Option<Community>> {
    let row =
        sqlx::query_as::<_, Community>(&format!("{COMMUNITY_SELECT} WHERE c.invite_token = $1"))
            .bind(token)
            .fetch_optional(db)
            .await
            .context("find community by invite token")?;
    Ok(row)
}

pub async fn list_owned(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Community>> {
    let rows = sqlx::query_as::<_, Community>(&format!(
        "{COMMUNITY_SELECT} WHERE c.owner_id = $1 ORDER BY c.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list owned communities")?;
    Ok(rows)
}

pub async fn list_joined(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Community>> {
    let rows = sqlx::query_as::<_, Community>(&format!(
        r#"{COMMUNITY_SELECT}
          WHERE EXISTS (SELECT 1 FROM community_members m
                         WHERE m.community_id = c.id AND m.user_id = $1)
          ORDER BY c.created_at DESC"#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list joined communities")?;
    Ok(rows)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    name: &str,
    is_active: bool,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE communities SET name = $2, is_active = $3 WHERE id = $1")
        .bind(id)
        .bind(name)
        .bind(is_active)
        .execute(db)
        .await
        .context("update community")?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM communities WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete community")?;
    Ok(res.rows_affected() > 0)
}

pub async fn rotate_invite_token(db: &PgPool, id: Uuid) -> anyhow::Result<Uuid> {
    let (token,): (Uuid,) = sqlx::query_as(
        "UPDATE communities SET invite_token = gen_random_uuid() WHERE id = $1 RETURNING invite_token",
    )
    .bind(id)
    .fetch_one(db)
    .await
    .context("rotate invite token")?;
    Ok(token)
}

pub async fn is_member(db: &PgPool, community_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM community_members WHERE community_id = $1 AND user_id = $2)",
    )
    .bind(community_id)
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("check membership")?;
    Ok(exists)
}

/// Returns `false` when the user was already a member.
pub async fn add_member<'e>(
    exec: impl PgExecutor<'e>,
    community_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO community_members (community_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(community_id)
    .bind(user_id)
    .execute(exec)
    .await
    .context("insert community member")?;
    Ok(res.rows_affected() > 0)
}

pub async fn remove_member(db: &PgPool, community_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM community_members WHERE community_id = $1 AND user_id = $2")
        .bind(community_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete community member")?;
    Ok(res.rows_affected() > 0)
}

pub async fn members(db: &PgPool, community_id: Uuid) -> anyhow::Result<Vec<Member>> {
    let rows = sqlx::query_as::<_, Member>(
        r#"
        SELECT u.id, u.username, u.email
          FROM community_members m
          JOIN users u ON u.id = m.user_id
         WHERE m.community_id = $1
         ORDER BY m.joined_at ASC
        "#,
    )
    .bind(community_id)
    .fetch_all(db)
    .await
    .context("list community members")?;
    Ok(rows)
}

/// Active communities the user belongs to.
pub async fn active_community_ids(db: &PgPool, user_id: Uuid) -> anyhow::Result<BTreeSet<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT c.id
          FROM communities c
          JOIN community_members m ON m.community_id = c.id
         WHERE m.user_id = $1 AND c.is_active
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list member community ids")?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Active items and subscriptions owned by the community's members.
pub async fn shared_counts(db: &PgPool, community_id: Uuid) -> anyhow::Result<(i64, i64)> {
    let row: (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM items i
              WHERE i.is_active
                AND i.owner_id IN (SELECT user_id FROM community_members WHERE community_id = $1)),
            (SELECT COUNT(*) FROM subscriptions s
              WHERE s.is_active
                AND s.owner_id IN (SELECT user_id FROM community_members WHERE community_id = $1))
        "#,
    )
    .bind(community_id)
    .fetch_one(db)
    .await
    .context("count shared resources")?;
    Ok(row)
}
