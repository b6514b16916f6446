use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Subscription;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub name: String,
    #[serde(default)]
    pub shared_to: Vec<Uuid>,
    #[serde(default)]
    pub shared_with: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub shared_to: Option<Vec<Uuid>>,
    pub shared_with: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub owner: String,
    pub is_active: bool,
    pub shared_to: Vec<Uuid>,
    pub shared_with_all: bool,
    pub shared_with: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Subscription> for SubscriptionView {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            name: s.name,
            owner_id: s.owner_id,
            owner: s.owner_username,
            is_active: s.is_active,
            shared_to: s.shared_to,
            shared_with_all: s.shared_with_all,
            shared_with: s.shared_with,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionLists {
    pub owned: Vec<SubscriptionView>,
    pub shared: Vec<SubscriptionView>,
    pub discover: Vec<SubscriptionView>,
}
