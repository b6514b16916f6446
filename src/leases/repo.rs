use anyhow::Context;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::validator::LeaseWindow;
use crate::discover::rules::LeaseEnd;

#[derive(Debug, Clone, FromRow)]
pub struct Lease {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub lessee_id: Uuid,
    pub lessee_username: String,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

const LEASE_SELECT: &str = r#"
    SELECT l.id, l.item_id, i.name AS item_name, i.owner_id, o.username AS owner_username,
           l.lessee_id, b.username AS lessee_username, l.start_date, l.end_date, l.created_at
      FROM leases l
      JOIN items i ON i.id = l.item_id
      JOIN users o ON o.id = i.owner_id
      JOIN users b ON b.id = l.lessee_id
"#;

const NO_OVERLAP_CONSTRAINT: &str = "leases_no_overlap";

/// The schema-level exclusion constraint fired; another writer won the race.
pub fn is_overlap_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.constraint() == Some(NO_OVERLAP_CONSTRAINT)
    )
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Lease>> {
    let row = sqlx::query_as::<_, Lease>(&format!("{LEASE_SELECT} WHERE l.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find lease")?;
    Ok(row)
}

/// Leases where the user is the borrower.
pub async fn list_for_lessee(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Lease>> {
    let rows = sqlx::query_as::<_, Lease>(&format!(
        "{LEASE_SELECT} WHERE l.lessee_id = $1 ORDER BY l.start_date DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list leases by lessee")?;
    Ok(rows)
}

/// Leases on items the user owns.
pub async fn list_for_owner(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Lease>> {
    let rows = sqlx::query_as::<_, Lease>(&format!(
        "{LEASE_SELECT} WHERE i.owner_id = $1 ORDER BY l.start_date DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list leases by owner")?;
    Ok(rows)
}

pub async fn list_for_item(db: &PgPool, item_id: Uuid) -> anyhow::Result<Vec<Lease>> {
    let rows = sqlx::query_as::<_, Lease>(&format!(
        "{LEASE_SELECT} WHERE l.item_id = $1 ORDER BY l.start_date ASC"
    ))
    .bind(item_id)
    .fetch_all(db)
    .await
    .context("list leases by item")?;
    Ok(rows)
}

/// End times of leases on `item_ids` still running after `now`.
pub async fn blocking_ends(
    db: &PgPool,
    item_ids: &[Uuid],
    now: OffsetDateTime,
) -> anyhow::Result<Vec<LeaseEnd>> {
    if item_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, LeaseEnd>(
        "SELECT item_id, end_date FROM leases WHERE item_id = ANY($1) AND end_date > $2",
    )
    .bind(item_ids)
    .bind(now)
    .fetch_all(db)
    .await
    .context("list blocking leases")?;
    Ok(rows)
}

pub async fn windows_for_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
) -> anyhow::Result<Vec<LeaseWindow>> {
    let rows = sqlx::query_as::<_, LeaseWindow>(
        "SELECT id, start_date, end_date FROM leases WHERE item_id = $1",
    )
    .bind(item_id)
    .fetch_all(&mut **tx)
    .await
    .context("load lease windows")?;
    Ok(rows)
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
    lessee_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO leases (item_id, lessee_id, start_date, end_date)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(item_id)
    .bind(lessee_id)
    .bind(start)
    .bind(end)
    .fetch_one(&mut **tx)
    .await
    .context("insert lease")?;
    Ok(id)
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    lessee_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE leases SET lessee_id = $2, start_date = $3, end_date = $4 WHERE id = $1")
        .bind(id)
        .bind(lessee_id)
        .bind(start)
        .bind(end)
        .execute(&mut **tx)
        .await
        .context("update lease")?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM leases WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete lease")?;
    Ok(res.rows_affected() > 0)
}
