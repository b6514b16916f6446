use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    compose::{compose, Digest, Entry, OutgoingEmail, SUBJECT},
    mailer::Mailer,
};
use crate::{
    auth::User,
    discover::{
        self,
        rules::{available_items, available_subscriptions, CommunityGraph, LeaseEnd},
    },
    items::repo::Item,
    leases,
    requests::repo::Request,
    state::AppState,
    subscriptions::repo::Subscription,
};

/// Candidate rows shared by every recipient of one run.
struct Snapshot {
    graph: CommunityGraph,
    items: Vec<Item>,
    blocking: Vec<LeaseEnd>,
    subscriptions: Vec<Subscription>,
    requests: Vec<Request>,
}

impl Snapshot {
    fn digest_for(&self, user: Uuid, now: OffsetDateTime) -> Digest {
        Digest {
            items: available_items(&self.graph, user, &self.items, &self.blocking, now)
                .into_iter()
                .map(|i| Entry::new(&i.name, &i.owner_username))
                .collect(),
            subscriptions: available_subscriptions(&self.graph, user, &self.subscriptions, |s| {
                &s.shared_to
            })
            .into_iter()
            .map(|s| Entry::new(&s.name, &s.owner_username))
            .collect(),
            requests: self
                .graph
                .visible_to(user, &self.requests)
                .into_iter()
                .map(|r| Entry::new(&r.name, &r.owner_username))
                .collect(),
        }
    }
}

async fn load_snapshot(st: &AppState, users: &[Uuid], now: OffsetDateTime) -> anyhow::Result<Snapshot> {
    let graph = discover::repo::load_full_graph(&st.db).await?;
    let items = crate::items::repo::list_active_by_owners(&st.db, users).await?;
    let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let blocking = leases::repo::blocking_ends(&st.db, &item_ids, now).await?;
    let subscriptions = crate::subscriptions::repo::list_active_by_owners(&st.db, users).await?;
    let requests = crate::requests::repo::list_open_by_owners(&st.db, users).await?;
    Ok(Snapshot {
        graph,
        items,
        blocking,
        subscriptions,
        requests,
    })
}

/// Sends each user a summary of what their communities offer. Returns the
/// number of emails handed to the mailer.
pub async fn send_weekly_digest(
    st: &AppState,
    mailer: &dyn Mailer,
    now: OffsetDateTime,
) -> anyhow::Result<usize> {
    let users = User::list_all(&st.db).await?;
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let snapshot = load_snapshot(st, &ids, now).await?;
    let from = st.config.mail_from.clone();

    let mut sent = 0;
    let mut failed = 0usize;
    for user in &users {
        let digest = snapshot.digest_for(user.id, now);
        let Some(body) = compose(&digest, &st.config.public_base_url) else {
            continue;
        };
        let email = OutgoingEmail {
            from: from.clone(),
            to: user.email.clone(),
            subject: SUBJECT.to_string(),
            body,
        };
        match mailer.send(&email).await {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "digest delivery failed");
                failed += 1;
            }
        }
    }

    info!(sent, failed, users = users.len(), "weekly digest finished");
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{discover::rules::Membership, items::repo::ItemType, requests::repo::RequestType};
    use time::{macros::datetime, Duration};

    fn now() -> OffsetDateTime {
        datetime!(2024-09-19 12:00 UTC)
    }

    fn item(owner: Uuid, owner_username: &str, name: &str) -> Item {
        Item {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id: owner,
            owner_username: owner_username.into(),
            is_active: true,
            item_type: ItemType::Other,
            shared_with_all: true,
            shared_with: vec![],
            is_leased: false,
            created_at: now() - Duration::days(3),
        }
    }

    fn subscription(owner: Uuid, name: &str, shared_to: Vec<Uuid>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id: owner,
            owner_username: "ben".into(),
            is_active: true,
            shared_with_all: true,
            shared_to,
            shared_with: vec![],
            created_at: now() - Duration::days(3),
        }
    }

    fn request(owner: Uuid, name: &str, is_completed: bool) -> Request {
        Request {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id: owner,
            owner_username: "ben".into(),
            request_type: RequestType::Item,
            is_completed,
            shared_with_all: true,
            shared_with: vec![],
            created_at: now() - Duration::days(3),
        }
    }

    #[test]
    fn digest_lists_only_what_the_user_could_use() {
        let (ana, ben, loner) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let street = Uuid::new_v4();

        let drill = item(ana, "ana", "Drill");
        let tent = item(ben, "ben", "Tent");
        let bike = item(ben, "ben", "Bike");
        let snapshot = Snapshot {
            graph: CommunityGraph::new([
                Membership { community_id: street, user_id: ana },
                Membership { community_id: street, user_id: ben },
            ]),
            blocking: vec![LeaseEnd { item_id: bike.id, end_date: now() + Duration::days(2) }],
            items: vec![drill, tent, bike],
            subscriptions: vec![
                subscription(ben, "Netflix", vec![ana]),
                subscription(ben, "Spotify", vec![]),
            ],
            requests: vec![request(ben, "Ladder", false), request(ben, "Tent pegs", true)],
        };

        let digest = snapshot.digest_for(ana, now());
        assert_eq!(digest.items, vec![Entry::new("Tent", "ben")]);
        assert_eq!(digest.subscriptions, vec![Entry::new("Spotify", "ben")]);
        assert_eq!(digest.requests, vec![Entry::new("Ladder", "ben")]);

        let nothing = snapshot.digest_for(loner, now());
        assert!(nothing.is_empty());
        assert!(compose(&nothing, "https://closeknit.test").is_none());
    }
}
