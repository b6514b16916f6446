use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::InviteState;

#[derive(Debug, Serialize)]
pub struct InviteCreated {
    pub token: Uuid,
    pub community_id: Uuid,
    pub invite_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// What the invitee sees before accepting.
#[derive(Debug, Serialize)]
pub struct InvitePreview {
    pub community_id: Uuid,
    pub community_name: String,
    pub invited_by: String,
    pub state: InviteState,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct InviteView {
    pub token: Uuid,
    pub state: InviteState,
    pub used_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub used_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
