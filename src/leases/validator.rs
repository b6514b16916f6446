//! Pre-write checks for lease windows.
//!
//! Every lease occupies the half-open interval `[start, end)`. A candidate is
//! accepted only when its range is non-empty and it shares no instant with any
//! other lease on the same item.

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaseError {
    #[error("End date must be after start date")]
    InvalidRange,

    #[error("Item is already leased from {start} to {end}")]
    Overlap {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },
}

/// Existing booking on an item, as loaded for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct LeaseWindow {
    pub id: Uuid,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
}

pub fn check_range(start: OffsetDateTime, end: OffsetDateTime) -> Result<(), LeaseError> {
    if end <= start {
        return Err(LeaseError::InvalidRange);
    }
    Ok(())
}

/// `[a_start, a_end)` and `[b_start, b_end)` share at least one instant.
pub fn overlaps(
    a_start: OffsetDateTime,
    a_end: OffsetDateTime,
    b_start: OffsetDateTime,
    b_end: OffsetDateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Validate a candidate window against the item's existing leases.
///
/// `replacing` names the lease being edited, which is not compared against itself.
pub fn validate(
    start: OffsetDateTime,
    end: OffsetDateTime,
    existing: &[LeaseWindow],
    replacing: Option<Uuid>,
) -> Result<(), LeaseError> {
    check_range(start, end)?;

    let clash = existing
        .iter()
        .filter(|w| Some(w.id) != replacing)
        .find(|w| overlaps(w.start_date, w.end_date, start, end));

    match clash {
        Some(w) => Err(LeaseError::Overlap {
            start: w.start_date,
            end: w.end_date,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::datetime, Duration};

    fn day(n: i64) -> OffsetDateTime {
        datetime!(2024-09-01 0:00 UTC) + Duration::days(n)
    }

    fn window(start: i64, end: i64) -> LeaseWindow {
        LeaseWindow {
            id: Uuid::new_v4(),
            start_date: day(start),
            end_date: day(end),
        }
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert_eq!(check_range(day(3), day(3)), Err(LeaseError::InvalidRange));
        assert_eq!(check_range(day(5), day(2)), Err(LeaseError::InvalidRange));
        assert_eq!(check_range(day(2), day(5)), Ok(()));
        assert_eq!(validate(day(4), day(4), &[], None), Err(LeaseError::InvalidRange));
    }

    #[test]
    fn tail_overlap_rejected_adjacent_accepted() {
        let existing = [window(0, 10)];
        assert!(matches!(
            validate(day(4), day(10), &existing, None),
            Err(LeaseError::Overlap { .. })
        ));
        assert_eq!(validate(day(10), day(15), &existing, None), Ok(()));
    }

    #[test]
    fn rejects_any_shared_instant() {
        let now = day(0);
        let existing = [LeaseWindow {
            id: Uuid::new_v4(),
            start_date: now - Duration::days(5),
            end_date: now + Duration::days(5),
        }];

        // today → tomorrow, contained
        assert!(validate(now, now + Duration::days(1), &existing, None).is_err());
        // two days ago → now, contained
        assert!(validate(now - Duration::days(2), now, &existing, None).is_err());
        // straddles the end
        assert!(validate(now + Duration::days(4), now + Duration::days(10), &existing, None).is_err());
        // fully after
        assert!(validate(now + Duration::days(6), now + Duration::days(10), &existing, None).is_ok());
        // enclosing the whole lease
        assert!(validate(now - Duration::days(9), now + Duration::days(9), &existing, None).is_err());
        // ends exactly where it starts
        assert!(validate(now - Duration::days(9), now - Duration::days(5), &existing, None).is_ok());
    }

    #[test]
    fn overlap_reports_the_blocking_lease() {
        let existing = [window(0, 3), window(7, 12)];
        let err = validate(day(10), day(14), &existing, None).unwrap_err();
        assert_eq!(
            err,
            LeaseError::Overlap {
                start: day(7),
                end: day(12)
            }
        );
    }

    #[test]
    fn editing_a_lease_ignores_itself() {
        let current = window(0, 10);
        let other = window(20, 30);
        let existing = [current, other];

        assert_eq!(validate(day(2), day(12), &existing, Some(current.id)), Ok(()));
        assert!(validate(day(2), day(21), &existing, Some(current.id)).is_err());
        assert!(validate(day(2), day(12), &existing, None).is_err());
    }

    #[test]
    fn accepted_windows_are_pairwise_disjoint() {
        let candidates = [(0, 5), (3, 8), (5, 9), (9, 9), (8, 12), (12, 13), (1, 2), (13, 20)];
        let mut accepted: Vec<LeaseWindow> = Vec::new();
        for (s, e) in candidates {
            if validate(day(s), day(e), &accepted, None).is_ok() {
                accepted.push(window(s, e));
            }
        }

        assert_eq!(accepted.len(), 4);
        for (i, a) in accepted.iter().enumerate() {
            assert!(a.end_date > a.start_date);
            for b in &accepted[i + 1..] {
                assert!(!overlaps(a.start_date, a.end_date, b.start_date, b.end_date));
            }
        }
    }
}
