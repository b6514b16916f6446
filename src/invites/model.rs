//! Single-use community invites.
//!
//! An invite is `Created` until it is either used once (`Used`) or outlives
//! its validity window (`Expired`). Both end states are final.

use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InviteError {
    #[error("Invite not found")]
    NotFound,

    #[error("This invite has already been used")]
    AlreadyUsed,

    #[error("This invite has expired")]
    Expired,

    #[error("This community is no longer active")]
    CommunityInactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteState {
    Created,
    Used,
    Expired,
}

#[derive(Debug, Clone, FromRow)]
pub struct Invite {
    pub id: Uuid,
    pub community_id: Uuid,
    pub token: Uuid,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
    pub used_by: Option<Uuid>,
    pub used_at: Option<OffsetDateTime>,
    pub is_used: bool,
}

impl Invite {
    pub fn expires_at(&self, ttl: Duration) -> OffsetDateTime {
        self.created_at + ttl
    }

    pub fn state(&self, now: OffsetDateTime, ttl: Duration) -> InviteState {
        if self.is_used {
            InviteState::Used
        } else if now - self.created_at >= ttl {
            InviteState::Expired
        } else {
            InviteState::Created
        }
    }

    pub fn check_usable(&self, now: OffsetDateTime, ttl: Duration) -> Result<(), InviteError> {
        match self.state(now, ttl) {
            InviteState::Created => Ok(()),
            InviteState::Used => Err(InviteError::AlreadyUsed),
            InviteState::Expired => Err(InviteError::Expired),
        }
    }

    /// Created → Used. Leaves the invite untouched when the transition is refused.
    pub fn redeem(&mut self, user_id: Uuid, now: OffsetDateTime, ttl: Duration) -> Result<(), InviteError> {
        self.check_usable(now, ttl)?;
        self.is_used = true;
        self.used_by = Some(user_id);
        self.used_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const DAY: Duration = Duration::hours(24);

    fn fresh(created_at: OffsetDateTime) -> Invite {
        Invite {
            id: Uuid::new_v4(),
            community_id: Uuid::new_v4(),
            token: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            created_at,
            used_by: None,
            used_at: None,
            is_used: false,
        }
    }

    #[test]
    fn valid_just_before_window_closes() {
        let t0 = datetime!(2024-09-19 08:00 UTC);
        let invite = fresh(t0);
        assert_eq!(invite.state(t0, DAY), InviteState::Created);
        assert_eq!(invite.state(t0 + Duration::hours(23) + Duration::minutes(59), DAY), InviteState::Created);
        assert_eq!(invite.expires_at(DAY), datetime!(2024-09-20 08:00 UTC));
    }

    #[test]
    fn expires_at_exactly_one_day() {
        let t0 = datetime!(2024-09-19 08:00 UTC);
        let mut invite = fresh(t0);
        assert_eq!(invite.state(t0 + DAY, DAY), InviteState::Expired);
        assert_eq!(
            invite.redeem(Uuid::new_v4(), t0 + Duration::days(3), DAY),
            Err(InviteError::Expired)
        );
        assert!(!invite.is_used);
        assert!(invite.used_by.is_none());
    }

    #[test]
    fn redeem_is_single_use() {
        let t0 = datetime!(2024-09-19 08:00 UTC);
        let mut invite = fresh(t0);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        invite.redeem(first, t0 + Duration::hours(1), DAY).unwrap();
        assert_eq!(invite.used_by, Some(first));
        assert_eq!(invite.used_at, Some(t0 + Duration::hours(1)));
        assert_eq!(invite.state(t0 + Duration::hours(2), DAY), InviteState::Used);

        assert_eq!(
            invite.redeem(second, t0 + Duration::hours(2), DAY),
            Err(InviteError::AlreadyUsed)
        );
        assert_eq!(invite.used_by, Some(first));
    }

    #[test]
    fn used_takes_precedence_over_expired() {
        let t0 = datetime!(2024-09-19 08:00 UTC);
        let mut invite = fresh(t0);
        invite.redeem(Uuid::new_v4(), t0, DAY).unwrap();
        assert_eq!(invite.state(t0 + Duration::days(10), DAY), InviteState::Used);
    }
}
