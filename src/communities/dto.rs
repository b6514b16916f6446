use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::communities::repo::{Community, Member};

#[derive(Debug, Deserialize)]
pub struct CreateCommunityRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommunityRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunitySummary {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_by: String,
    pub is_active: bool,
    pub member_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Community> for CommunitySummary {
    fn from(c: Community) -> Self {
        Self {
            id: c.id,
            name: c.name,
            owner_id: c.owner_id,
            created_by: c.owner_username,
            is_active: c.is_active,
            member_count: c.member_count,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommunityLists {
    pub owned: Vec<CommunitySummary>,
    pub joined: Vec<CommunitySummary>,
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<Member> for MemberView {
    fn from(m: Member) -> Self {
        Self {
            id: m.id,
            username: m.username,
            email: m.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommunityDetail {
    pub id: Uuid,
    pub community_name: String,
    pub is_active: bool,
    /// Standing join link built from the community's invite token.
    pub invite_link: String,
    pub created_by: String,
    pub member_count: i64,
    pub shared_items_count: i64,
    pub shared_subscriptions_count: i64,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Serialize)]
pub struct InviteLinkResponse {
    pub invite_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_serializes_join_link() {
        let detail = CommunityDetail {
            id: Uuid::new_v4(),
            community_name: "Maple Street".into(),
            is_active: true,
            invite_link: "https://closeknit.test/api/v1/join/abc".into(),
            created_by: "ana".into(),
            member_count: 1,
            shared_items_count: 0,
            shared_subscriptions_count: 0,
            members: vec![],
        };
        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.contains("/join/abc"));
        assert!(json.contains("\"created_by\":\"ana\""));
    }
}
