use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Item, ItemType};
use crate::leases::dto::LeaseView;

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub shared_with: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub item_type: Option<ItemType>,
    pub shared_with: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub owner: String,
    pub is_active: bool,
    pub item_type: ItemType,
    pub shared_with_all: bool,
    pub shared_with: Vec<Uuid>,
    pub is_leased: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Item> for ItemView {
    fn from(i: Item) -> Self {
        Self {
            id: i.id,
            name: i.name,
            owner_id: i.owner_id,
            owner: i.owner_username,
            is_active: i.is_active,
            item_type: i.item_type,
            shared_with_all: i.shared_with_all,
            shared_with: i.shared_with,
            is_leased: i.is_leased,
            created_at: i.created_at,
        }
    }
}

/// Everything on the caller's items page.
#[derive(Debug, Serialize)]
pub struct ItemsOverview {
    pub owned: Vec<ItemView>,
    pub leased: Vec<LeaseView>,
    pub leased_out: Vec<LeaseView>,
    pub discover: Vec<ItemView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_defaults_to_other() {
        let req: CreateItemRequest = serde_json::from_str(r#"{"name":"Drill"}"#).unwrap();
        assert_eq!(req.item_type, ItemType::Other);
        assert!(req.shared_with.is_empty());

        let req: CreateItemRequest =
            serde_json::from_str(r#"{"name":"Dune","item_type":"book"}"#).unwrap();
        assert_eq!(req.item_type, ItemType::Book);
    }

    #[test]
    fn unknown_item_type_is_rejected() {
        let res: Result<CreateItemRequest, _> =
            serde_json::from_str(r#"{"name":"Car","item_type":"vehicle"}"#);
        assert!(res.is_err());
    }
}
