use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::discover::rules::Shared;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "item_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Book,
    Electronics,
    #[default]
    Other,
}

#[derive(Debug, Clone, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub is_active: bool,
    pub item_type: ItemType,
    /// Ignore `shared_with` and reach every community of the owner.
    pub shared_with_all: bool,
    pub shared_with: Vec<Uuid>,
    /// Some lease covers the current instant.
    pub is_leased: bool,
    pub created_at: OffsetDateTime,
}

impl Shared for Item {
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

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.name, i.owner_id, u.username AS owner_username, i.is_active, i.item_type, i.shared_with_all,
           ARRAY(SELECT ic.community_id FROM item_communities ic WHERE ic.item_id = i.id) AS shared_with,
           EXISTS (SELECT 1 FROM leases l
                    WHERE l.item_id = i.id AND l.start_date <= now() AND l.end_date > now()) AS is_leased,
           i.created_at
      FROM items i
      JOIN users u ON u.id = i.owner_id
"#;

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Item>> {
    let row = sqlx::query_as::<_, Item>(&format!("{ITEM_SELECT} WHERE i.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find item")?;
    Ok(row)
}

pub async fn list_owned(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Item>> {
    let rows = sqlx::query_as::<_, Item>(&format!(
        "{ITEM_SELECT} WHERE i.owner_id = $1 ORDER BY i.created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(db)
    .await
    .context("list owned items")?;
    Ok(rows)
}

/// Active items owned by any of `owners`; visibility is decided by the caller.
pub async fn list_active_by_owners(db: &PgPool, owners: &[Uuid]) -> anyhow::Result<Vec<Item>> {
    if owners.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, Item>(&format!(
        "{ITEM_SELECT} WHERE i.is_active AND i.owner_id = ANY($1) ORDER BY i.created_at DESC"
    ))
    .bind(owners)
    .fetch_all(db)
    .await
    .context("list items by owners")?;
    Ok(rows)
}

pub async fn create(
    db: &PgPool,
    owner_id: Uuid,
    name: &str,
    item_type: ItemType,
    shared_with: &[Uuid],
) -> anyhow::Result<Uuid> {
    let mut tx = db.begin().await.context("begin tx")?;
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO items (name, owner_id, item_type, shared_with_all)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(owner_id)
    .bind(item_type)
    .bind(shared_with.is_empty())
    .fetch_one(&mut *tx)
    .await
    .context("insert item")?;

    replace_shared_with_tx(&mut tx, id, shared_with).await?;
    tx.commit().await.context("commit tx")?;
    Ok(id)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    name: &str,
    is_active: bool,
    item_type: ItemType,
    shared_with: Option<&[Uuid]>,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query(
        r#"
        UPDATE items
           SET name = $2,
               is_active = $3,
               item_type = $4,
               shared_with_all = COALESCE($5, shared_with_all)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(is_active)
    .bind(item_type)
    .bind(shared_with.map(<[Uuid]>::is_empty))
    .execute(&mut *tx)
    .await
    .context("update item")?;
    if let Some(shared_with) = shared_with {
        replace_shared_with_tx(&mut tx, id, shared_with).await?;
    }
    tx.commit().await.context("commit tx")?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete item")?;
    Ok(res.rows_affected() > 0)
}

/// Row-locks the item; lease writes for one item serialize on this lock.
pub async fn lock_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> anyhow::Result<Option<Item>> {
    let row = sqlx::query_as::<_, Item>(&format!("{ITEM_SELECT} WHERE i.id = $1 FOR UPDATE OF i"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("lock item")?;
    Ok(row)
}

async fn replace_shared_with_tx(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
    communities: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM item_communities WHERE item_id = $1")
        .bind(item_id)
        .execute(&mut **tx)
        .await
        .context("clear item shares")?;
    sqlx::query(
        r#"
        INSERT INTO item_communities (item_id, community_id)
        SELECT $1, UNNEST($2::uuid[])
        "#,
    )
    .bind(item_id)
    .bind(communities)
    .execute(&mut **tx)
    .await
    .context("insert item shares")?;
    Ok(())
}
