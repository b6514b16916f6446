use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::discover::rules::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Item,
    Subscription,
}

/// Someone asking their communities for an item or a subscription seat.
#[derive(Debug, Clone, FromRow)]
pub struct Request {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub request_type: RequestType,
    pub is_completed: bool,
    /// Ignore `shared_with` and reach every community of the owner.
    pub shared_with_all: bool,
    pub shared_with: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

impl Shared for Request {
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
        !self.is_completed
    }
}

const REQUEST_SELECT: &str = r#"
    SELECT r.id, r.name, r.owner_id, u.username AS owner_username, r.request_type, r.is_completed, r.shared_with_all,
           ARRAY(SELECT rc.community_id FROM request_communities rc WHERE rc.request_id = r.id) AS shared_with,
           r.created_at
      FROM requests r
      JOIN users u ON u.id = r.owner_id
"#;

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Request>> {
    let row = sqlx::query_as::<_, Request>(&format!("{REQUEST_SELECT} WHERE r.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find request")?;
    Ok(row)
}

pub async fn list_owned(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Request>> {
    let rows = sqlx::query_as::<_, Request>(&format!(
        "{REQUEST_SELECT} WHERE r.owner_id = $1 ORDER BY r.created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(db)
    .await
    .context("list owned requests")?;
    Ok(rows)
}

pub async fn list_open_by_owners(db: &PgPool, owners: &[Uuid]) -> anyhow::Result<Vec<Request>> {
    if owners.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, Request>(&format!(
        "{REQUEST_SELECT} WHERE NOT r.is_completed AND r.owner_id = ANY($1) ORDER BY r.created_at DESC"
    ))
    .bind(owners)
    .fetch_all(db)
    .await
    .context("list open requests by owners")?;
    Ok(rows)
}

pub async fn create(
    db: &PgPool,
    owner_id: Uuid,
    name: &str,
    request_type: RequestType,
    shared_with: &[Uuid],
) -> anyhow::Result<Uuid> {
    let mut tx = db.begin().await.context("begin tx")?;
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO requests (name, owner_id, request_type, shared_with_all)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(owner_id)
    .bind(request_type)
    .bind(shared_with.is_empty())
    .fetch_one(&mut *tx)
    .await
    .context("insert request")?;

    replace_shared_with_tx(&mut tx, id, shared_with).await?;
    tx.commit().await.context("commit tx")?;
    Ok(id)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    name: &str,
    request_type: RequestType,
    shared_with: Option<&[Uuid]>,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query(
        r#"
        UPDATE requests
           SET name = $2,
               request_type = $3,
               shared_with_all = COALESCE($4, shared_with_all)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(request_type)
    .bind(shared_with.map(<[Uuid]>::is_empty))
    .execute(&mut *tx)
    .await
    .context("update request")?;
    if let Some(shared_with) = shared_with {
        replace_shared_with_tx(&mut tx, id, shared_with).await?;
    }
    tx.commit().await.context("commit tx")?;
    Ok(())
}

pub async fn set_completed(db: &PgPool, id: Uuid, completed: bool) -> anyhow::Result<()> {
    sqlx::query("UPDATE requests SET is_completed = $2 WHERE id = $1")
        .bind(id)
        .bind(completed)
        .execute(db)
        .await
        .context("set request completion")?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM requests WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete request")?;
    Ok(res.rows_affected() > 0)
}

async fn replace_shared_with_tx(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
    communities: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM request_communities WHERE request_id = $1")
        .bind(request_id)
        .execute(&mut **tx)
        .await
        .context("clear request shares")?;
    sqlx::query(
        "INSERT INTO request_communities (request_id, community_id) SELECT $1, UNNEST($2::uuid[])",
    )
    .bind(request_id)
    .bind(communities)
    .execute(&mut **tx)
    .await
    .context("insert request shares")?;
    Ok(())
}
