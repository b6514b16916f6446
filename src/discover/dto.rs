use serde::Serialize;

use crate::{
    items::dto::ItemView, requests::dto::RequestView, subscriptions::dto::SubscriptionView,
};

/// What the caller can find across all their communities.
#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub items: Vec<ItemView>,
    pub subscriptions: Vec<SubscriptionView>,
    pub requests: Vec<RequestView>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub items_count: i64,
    pub subscriptions_count: i64,
    pub total_shared: i64,
    pub available_items_count: i64,
    pub available_subscriptions_count: i64,
    pub total_available: i64,
    pub communities_count: i64,
    pub peers_count: i64,
}

impl Dashboard {
    pub fn new(
        (items_count, subscriptions_count): (i64, i64),
        (available_items_count, available_subscriptions_count): (i64, i64),
        communities_count: i64,
        peers_count: i64,
    ) -> Self {
        Self {
            items_count,
            subscriptions_count,
            total_shared: items_count + subscriptions_count,
            available_items_count,
            available_subscriptions_count,
            total_available: available_items_count + available_subscriptions_count,
            communities_count,
            peers_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_are_sums() {
        let d = Dashboard::new((3, 1), (4, 2), 2, 5);
        assert_eq!(d.total_shared, 4);
        assert_eq!(d.total_available, 6);

        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["peers_count"], 5);
        assert_eq!(json["communities_count"], 2);
    }
}
