use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Request, RequestType};

#[derive(Debug, Deserialize)]
pub struct CreateRequestRequest {
    pub name: String,
    pub request_type: RequestType,
    #[serde(default)]
    pub shared_with: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequestRequest {
    pub name: Option<String>,
    pub request_type: Option<RequestType>,
    pub shared_with: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct RequestView {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub owner: String,
    pub request_type: RequestType,
    pub is_completed: bool,
    pub shared_with_all: bool,
    pub shared_with: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Request> for RequestView {
    fn from(r: Request) -> Self {
        Self {
            id: r.id,
            name: r.name,
            owner_id: r.owner_id,
            owner: r.owner_username,
            request_type: r.request_type,
            is_completed: r.is_completed,
            shared_with_all: r.shared_with_all,
            shared_with: r.shared_with,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestLists {
    pub owned: Vec<RequestView>,
    pub community: Vec<RequestView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_type_is_required_and_lowercase() {
        let req: CreateRequestRequest =
            serde_json::from_str(r#"{"name":"Ladder","request_type":"item"}"#).unwrap();
        assert_eq!(req.request_type, RequestType::Item);

        assert!(serde_json::from_str::<CreateRequestRequest>(r#"{"name":"Ladder"}"#).is_err());
        assert!(serde_json::from_str::<CreateRequestRequest>(
            r#"{"name":"Netflix","request_type":"Subscription"}"#
        )
        .is_err());
    }
}
