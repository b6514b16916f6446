use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Lease;

#[derive(Debug, Deserialize)]
pub struct CreateLeaseRequest {
    pub item_id: Uuid,
    pub lessee_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLeaseRequest {
    pub lessee_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct LeaseView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub owner: String,
    pub lessee_id: Uuid,
    pub lessee: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
}

impl From<Lease> for LeaseView {
    fn from(l: Lease) -> Self {
        Self {
            id: l.id,
            item_id: l.item_id,
            item_name: l.item_name,
            owner: l.owner_username,
            lessee_id: l.lessee_id,
            lessee: l.lessee_username,
            start_date: l.start_date,
            end_date: l.end_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeaseLists {
    pub leased: Vec<LeaseView>,
    pub leased_out: Vec<LeaseView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_parses_rfc3339_dates() {
        let raw = r#"{
            "item_id": "2b0c8f3e-8a9e-4f43-9d55-0e1c2f8c5a10",
            "lessee_id": "7f1d4c1a-1111-4c7e-9a0b-3d2e1f0a9b8c",
            "start_date": "2024-09-19T10:00:00Z",
            "end_date": "2024-09-29T10:00:00+02:00"
        }"#;
        let req: CreateLeaseRequest = serde_json::from_str(raw).unwrap();
        assert!(req.end_date > req.start_date);
        assert_eq!(req.start_date.unix_timestamp(), 1_726_740_000);
    }

    #[test]
    fn update_request_fields_are_optional() {
        let req: UpdateLeaseRequest = serde_json::from_str("{}").unwrap();
        assert!(req.lessee_id.is_none());
        assert!(req.start_date.is_none());
        assert!(req.end_date.is_none());

        let req: UpdateLeaseRequest =
            serde_json::from_str(r#"{"end_date":"2024-10-01T00:00:00Z"}"#).unwrap();
        assert!(req.end_date.is_some());
    }
}
