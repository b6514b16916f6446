use anyhow::Context;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{LeaseLists, UpdateLeaseRequest},
    repo::{self, Lease},
    validator,
};
use crate::{
    discover,
    error::{AppError, AppResult},
    items::{self, repo::Item},
    state::AppState,
};

/// Maps the write-time exclusion violation onto the same rejection the validator gives.
fn overlap_or_internal(err: anyhow::Error) -> AppError {
    if repo::is_overlap_violation(&err) {
        AppError::conflict("Item is already leased for part of that period")
    } else {
        AppError::Internal(err)
    }
}

async fn lock_item(tx: &mut Transaction<'_, Postgres>, item_id: Uuid) -> AppResult<Item> {
    items::repo::lock_tx(tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))
}

/// Validator plus write, inside a transaction that already holds the item lock.
async fn write_locked(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
    replacing: Option<Uuid>,
    lessee_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> AppResult<Uuid> {
    let existing = repo::windows_for_item_tx(tx, item_id).await?;
    if let Err(e) = validator::validate(start, end, &existing, replacing) {
        warn!(%item_id, error = %e, "lease rejected");
        return Err(e.into());
    }

    match replacing {
        Some(id) => {
            repo::update_tx(tx, id, lessee_id, start, end)
                .await
                .map_err(overlap_or_internal)?;
            Ok(id)
        }
        None => repo::insert_tx(tx, item_id, lessee_id, start, end)
            .await
            .map_err(overlap_or_internal),
    }
}

async fn reload(st: &AppState, id: Uuid) -> AppResult<Lease> {
    repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Lease not found"))
}

/// Owner leases one of their items to a community peer.
pub async fn create_lease(
    st: &AppState,
    owner_id: Uuid,
    item_id: Uuid,
    lessee_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> AppResult<Lease> {
    validator::check_range(start, end)?;
    if lessee_id == owner_id {
        return Err(AppError::bad_request("You cannot lease an item to yourself"));
    }
    let graph = discover::repo::load_graph(&st.db, owner_id).await?;
    if !graph.peers_of(owner_id).contains(&lessee_id) {
        return Err(AppError::bad_request(
            "Lessee must be a member of one of your communities",
        ));
    }

    let mut tx = st.db.begin().await.context("begin tx")?;
    let item = lock_item(&mut tx, item_id).await?;
    if item.owner_id != owner_id {
        warn!(%item_id, %owner_id, "non-owner tried to lease item");
        return Err(AppError::forbidden("Only the item owner can lease it out"));
    }
    if !item.is_active {
        return Err(AppError::bad_request("Item is not active"));
    }
    let id = write_locked(&mut tx, item_id, None, lessee_id, start, end).await?;
    tx.commit().await.context("commit tx")?;

    info!(lease_id = %id, %item_id, %lessee_id, "lease created");
    reload(st, id).await
}

/// Counterparty flow: the borrower books a visible item of someone else.
pub async fn borrow_item(
    st: &AppState,
    borrower_id: Uuid,
    item_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> AppResult<Lease> {
    validator::check_range(start, end)?;
    let graph = discover::repo::load_graph(&st.db, borrower_id).await?;

    let mut tx = st.db.begin().await.context("begin tx")?;
    let item = lock_item(&mut tx, item_id).await?;
    if item.owner_id == borrower_id {
        return Err(AppError::bad_request("You cannot borrow your own item"));
    }
    if graph.visible_to(borrower_id, std::slice::from_ref(&item)).is_empty() {
        return Err(AppError::not_found("Item not found"));
    }
    let id = write_locked(&mut tx, item_id, None, borrower_id, start, end).await?;
    tx.commit().await.context("commit tx")?;

    info!(lease_id = %id, %item_id, %borrower_id, "item borrowed");
    reload(st, id).await
}

pub async fn update_lease(
    st: &AppState,
    owner_id: Uuid,
    lease_id: Uuid,
    patch: UpdateLeaseRequest,
) -> AppResult<Lease> {
    let current = reload(st, lease_id).await?;
    if current.owner_id != owner_id {
        return Err(AppError::forbidden("Only the item owner can change a lease"));
    }
    let start = patch.start_date.unwrap_or(current.start_date);
    let end = patch.end_date.unwrap_or(current.end_date);
    validator::check_range(start, end)?;

    let lessee_id = patch.lessee_id.unwrap_or(current.lessee_id);
    if lessee_id != current.lessee_id {
        if lessee_id == owner_id {
            return Err(AppError::bad_request("You cannot lease an item to yourself"));
        }
        let graph = discover::repo::load_graph(&st.db, owner_id).await?;
        if !graph.peers_of(owner_id).contains(&lessee_id) {
            return Err(AppError::bad_request(
                "Lessee must be a member of one of your communities",
            ));
        }
    }

    let mut tx = st.db.begin().await.context("begin tx")?;
    lock_item(&mut tx, current.item_id).await?;
    write_locked(&mut tx, current.item_id, Some(lease_id), lessee_id, start, end).await?;
    tx.commit().await.context("commit tx")?;

    info!(%lease_id, "lease updated");
    reload(st, lease_id).await
}

pub async fn delete_lease(st: &AppState, owner_id: Uuid, lease_id: Uuid) -> AppResult<()> {
    let lease = reload(st, lease_id).await?;
    if lease.owner_id != owner_id {
        return Err(AppError::forbidden("Only the item owner can delete a lease"));
    }
    repo::delete(&st.db, lease_id).await?;
    info!(%lease_id, "lease deleted");
    Ok(())
}

/// A lease is visible to its lessee and to the item owner.
pub async fn get_lease(st: &AppState, user_id: Uuid, lease_id: Uuid) -> AppResult<Lease> {
    let lease = reload(st, lease_id).await?;
    if lease.owner_id != user_id && lease.lessee_id != user_id {
        return Err(AppError::not_found("Lease not found"));
    }
    Ok(lease)
}

pub async fn list(st: &AppState, user_id: Uuid) -> AppResult<LeaseLists> {
    let leased = repo::list_for_lessee(&st.db, user_id).await?;
    let leased_out = repo::list_for_owner(&st.db, user_id).await?;
    Ok(LeaseLists {
        leased: leased.into_iter().map(Into::into).collect(),
        leased_out: leased_out.into_iter().map(Into::into).collect(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::{borrow::Cow, error::Error as StdError, fmt};

    #[derive(Debug)]
    struct ConstraintViolation(&'static str);

    impl fmt::Display for ConstraintViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "violates constraint {}", self.0)
        }
    }

    impl StdError for ConstraintViolation {}

    impl sqlx::error::DatabaseError for ConstraintViolation {
        fn message(&self) -> &str {
            "conflicting key value violates exclusion constraint"
        }
        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23P01"))
        }
        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }
        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }
        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }
        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }
        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn db_failure(constraint: &'static str) -> anyhow::Error {
        let err = sqlx::Error::Database(Box::new(ConstraintViolation(constraint)));
        Err::<(), _>(err).context("insert lease").unwrap_err()
    }

    #[test]
    fn exclusion_violation_is_reported_as_conflict() {
        let err = overlap_or_internal(db_failure("leases_no_overlap"));
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn other_failures_stay_internal() {
        let err = overlap_or_internal(db_failure("leases_lessee_id_fkey"));
        assert!(matches!(err, AppError::Internal(_)));

        let err = overlap_or_internal(anyhow::anyhow!("connection reset"));
        assert!(matches!(err, AppError::Internal(_)));

        let err = overlap_or_internal(
            Err::<(), _>(sqlx::Error::RowNotFound)
                .context("insert lease")
                .unwrap_err(),
        );
        assert!(matches!(err, AppError::Internal(_)));
    }
}
