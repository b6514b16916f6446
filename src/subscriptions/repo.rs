use anyhow::Context;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::discover::rules::Shared;

#[derive(Debug, Clone, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub is_active: bool,
    /// Users the owner shares the subscription with directly.
    pub shared_to: Vec<Uuid>,
    /// Ignore `shared_with` and reach every community of the owner.
    pub shared_with_all: bool,
    pub shared_with: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

impl Shared for Subscription {
    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
    fn shared_with(&self) -> &[Uuid] {
        &self.shared_with
    }
    fn shares_with_all(&self) -> bool {
        self.shared_with_all
    }
    fn is_listed(&self) -> bool {
        self.is_active
    }
}

const SUBSCRIPTION_SELECT: &str = r#"
    SELECT s.id, s.name, s.owner_id, u.username AS owner_username, s.is_active, s.shared_with_all,
           ARRAY(SELECT su.user_id FROM subscription_users su WHERE su.subscription_id = s.id) AS shared_to,
           ARRAY(SELECT sc.community_id FROM subscription_communities sc WHERE sc.subscription_id = s.id) AS shared_with,
           s.created_at
      FROM subscriptions s
      JOIN users u ON u.id = s.owner_id
"#;

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Subscription>> {
    let row = sqlx::query_as::<_, Subscription>(&format!("{SUBSCRIPTION_SELECT} WHERE s.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find subscription")?;
    Ok(row)
}

pub async fn list_owned(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Subscription>> {
    let rows = sqlx::query_as::<_, Subscription>(&format!(
        "{SUBSCRIPTION_SELECT} WHERE s.owner_id = $1 ORDER BY s.created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(db)
    .await
    .context("list owned subscriptions")?;
    Ok(rows)
}

/// Active subscriptions shared directly with `user_id`.
pub async fn list_shared_to(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Subscription>> {
    let rows = sqlx::query_as::<_, Subscription>(&format!(
        r#"{SUBSCRIPTION_SELECT}
         WHERE s.is_active
           AND EXISTS (SELECT 1 FROM subscription_users su
                        WHERE su.subscription_id = s.id AND su.user_id = $1)
         ORDER BY s.created_at DESC"#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list subscriptions shared to user")?;
    Ok(rows)
}

pub async fn list_active_by_owners(
    db: &PgPool,
    owners: &[Uuid],
) -> anyhow::Result<Vec<Subscription>> {
    if owners.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, Subscription>(&format!(
        "{SUBSCRIPTION_SELECT} WHERE s.is_active AND s.owner_id = ANY($1) ORDER BY s.created_at DESC"
    ))
    .bind(owners)
    .fetch_all(db)
    .await
    .context("list subscriptions by owners")?;
    Ok(rows)
}

pub async fn create(
    db: &PgPool,
    owner_id: Uuid,
    name: &str,
    shared_to: &[Uuid],
    shared_with: &[Uuid],
) -> anyhow::Result<Uuid> {
    let mut tx = db.begin().await.context("begin tx")?;
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO subscriptions (name, owner_id, shared_with_all)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(owner_id)
    .bind(shared_with.is_empty())
    .fetch_one(&mut *tx)
    .await
    .context("insert subscription")?;

    replace_shared_to_tx(&mut tx, id, shared_to).await?;
    replace_shared_with_tx(&mut tx, id, shared_with).await?;
    tx.commit().await.context("commit tx")?;
    Ok(id)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    name: &str,
    is_active: bool,
    shared_to: Option<&[Uuid]>,
    shared_with: Option<&[Uuid]>,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query(
        r#"
        UPDATE subscriptions
           SET name = $2,
               is_active = $3,
               shared_with_all = COALESCE($4, shared_with_all)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(is_active)
    .bind(shared_with.map(<[Uuid]>::is_empty))
    .execute(&mut *tx)
    .await
    .context("update subscription")?;
    if let Some(users) = shared_to {
        replace_shared_to_tx(&mut tx, id, users).await?;
    }
    if let Some(communities) = shared_with {
        replace_shared_with_tx(&mut tx, id, communities).await?;
    }
    tx.commit().await.context("commit tx")?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete subscription")?;
    Ok(res.rows_affected() > 0)
}

async fn replace_shared_to_tx(
    tx: &mut Transaction<'_, Postgres>,
    subscription_id: Uuid,
    users: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM subscription_users WHERE subscription_id = $1")
        .bind(subscription_id)
        .execute(&mut **tx)
        .await
        .context("clear subscription users")?;
    sqlx::query(
        "INSERT INTO subscription_users (subscription_id, user_id) SELECT $1, UNNEST($2::uuid[])",
    )
    .bind(subscription_id)
    .bind(users)
    .execute(&mut **tx)
    .await
    .context("insert subscription users")?;
    Ok(())
}

async fn replace_shared_with_tx(
    tx: &mut Transaction<'_, Postgres>,
    subscription_id: Uuid,
    communities: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM subscription_communities WHERE subscription_id = $1")
        .bind(subscription_id)
        .execute(&mut **tx)
        .await
        .context("clear subscription shares")?;
    sqlx::query(
        r#"
        INSERT INTO subscription_communities (subscription_id, community_id)
        SELECT $1, UNNEST($2::uuid[])
        "#,
    )
    .bind(subscription_id)
    .bind(communities)
    .execute(&mut **tx)
    .await
    .context("insert subscription shares")?;
    Ok(())
}
