//! Visibility over the community membership relation.
//!
//! Everything here is pure: callers load a [`CommunityGraph`] snapshot and the
//! candidate rows, then ask which of them a viewer may see. A resource marked
//! `shared_with_all` reaches every community its owner belongs to; otherwise
//! it reaches only the listed communities the owner is still in. A restricted
//! resource whose communities were all deleted reaches nobody.

use std::collections::{BTreeSet, HashMap, HashSet};

use time::OffsetDateTime;
use uuid::Uuid;

/// One row of `community_members`, restricted to active communities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Membership {
    pub community_id: Uuid,
    pub user_id: Uuid,
}

/// Something owned by a user and shared with a set of communities.
pub trait Shared {
    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
    fn shared_with(&self) -> &[Uuid];
    fn shares_with_all(&self) -> bool;
    /// Inactive (or completed) resources are never offered to others.
    fn is_listed(&self) -> bool;
}

/// Lease end times that still block an item at query time.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct LeaseEnd {
    pub item_id: Uuid,
    pub end_date: OffsetDateTime,
}

#[derive(Debug, Default, Clone)]
pub struct CommunityGraph {
    members: HashMap<Uuid, HashSet<Uuid>>,
    communities: HashMap<Uuid, HashSet<Uuid>>,
}

impl CommunityGraph {
    pub fn new(memberships: impl IntoIterator<Item = Membership>) -> Self {
        let mut graph = Self::default();
        for m in memberships {
            graph
                .members
                .entry(m.community_id)
                .or_default()
                .insert(m.user_id);
            graph
                .communities
                .entry(m.user_id)
                .or_default()
                .insert(m.community_id);
        }
        graph
    }

    pub fn communities_of(&self, user: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.communities
            .get(&user)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn is_member(&self, user: Uuid, community: Uuid) -> bool {
        self.members
            .get(&community)
            .is_some_and(|m| m.contains(&user))
    }

    /// Everyone sharing at least one community with `user`, excluding `user`.
    pub fn peers_of(&self, user: Uuid) -> BTreeSet<Uuid> {
        self.communities_of(user)
            .filter_map(|c| self.members.get(&c))
            .flatten()
            .copied()
            .filter(|u| *u != user)
            .collect()
    }

    /// Communities a resource owned by `owner` is effectively shared with.
    pub fn reach(&self, owner: Uuid, all: bool, shared_with: &[Uuid]) -> HashSet<Uuid> {
        if all {
            self.communities_of(owner).collect()
        } else {
            shared_with
                .iter()
                .copied()
                .filter(|c| self.is_member(owner, *c))
                .collect()
        }
    }

    pub fn is_shared_with<T: Shared>(&self, viewer: Uuid, resource: &T) -> bool {
        self.reach(resource.owner_id(), resource.shares_with_all(), resource.shared_with())
            .iter()
            .any(|c| self.is_member(viewer, *c))
    }

    /// Listed resources of other users that reach one of `viewer`'s communities.
    pub fn visible_to<'a, T: Shared>(&self, viewer: Uuid, rows: &'a [T]) -> Vec<&'a T> {
        rows.iter()
            .filter(|r| r.is_listed())
            .filter(|r| r.owner_id() != viewer)
            .filter(|r| self.is_shared_with(viewer, *r))
            .collect()
    }
}

/// Items `viewer` could borrow right now: visible, and with no lease ending after `now`.
pub fn available_items<'a, T: Shared>(
    graph: &CommunityGraph,
    viewer: Uuid,
    items: &'a [T],
    leases: &[LeaseEnd],
    now: OffsetDateTime,
) -> Vec<&'a T> {
    let blocked: HashSet<Uuid> = leases
        .iter()
        .filter(|l| l.end_date > now)
        .map(|l| l.item_id)
        .collect();

    graph
        .visible_to(viewer, items)
        .into_iter()
        .filter(|i| !blocked.contains(&i.id()))
        .collect()
}

/// Subscriptions `viewer` could ask to join: visible, and not already shared to them directly.
pub fn available_subscriptions<'a, T: Shared>(
    graph: &CommunityGraph,
    viewer: Uuid,
    subscriptions: &'a [T],
    shared_to: impl Fn(&T) -> &[Uuid],
) -> Vec<&'a T> {
    graph
        .visible_to(viewer, subscriptions)
        .into_iter()
        .filter(|s| !shared_to(s).contains(&viewer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::datetime, Duration};

    #[derive(Debug, Clone)]
    struct Res {
        id: Uuid,
        owner: Uuid,
        all: bool,
        shared_with: Vec<Uuid>,
        shared_to: Vec<Uuid>,
        listed: bool,
    }

    impl Res {
        fn new(owner: Uuid) -> Self {
            Self {
                id: Uuid::new_v4(),
                owner,
                all: true,
                shared_with: vec![],
                shared_to: vec![],
                listed: true,
            }
        }
    }

    impl Shared for Res {
        fn id(&self) -> Uuid {
            self.id
        }
        fn owner_id(&self) -> Uuid {
            self.owner
        }
        fn shared_with(&self) -> &[Uuid] {
            &self.shared_with
        }
        fn shares_with_all(&self) -> bool {
            self.all
        }
        fn is_listed(&self) -> bool {
            self.listed
        }
    }

    struct World {
        ana: Uuid,
        ben: Uuid,
        cleo: Uuid,
        dan: Uuid,
        street: Uuid,
        office: Uuid,
        graph: CommunityGraph,
    }

    /// street = {ana, ben, cleo}, office = {cleo, dan}
    fn world() -> World {
        let (ana, ben, cleo, dan) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (street, office) = (Uuid::new_v4(), Uuid::new_v4());
        let m = |community_id, user_id| Membership { community_id, user_id };
        let graph = CommunityGraph::new([
            m(street, ana),
            m(street, ben),
            m(street, cleo),
            m(office, cleo),
            m(office, dan),
        ]);
        World { ana, ben, cleo, dan, street, office, graph }
    }

    fn now() -> OffsetDateTime {
        datetime!(2024-09-19 12:00 UTC)
    }

    #[test]
    fn peers_are_distinct_and_exclude_self() {
        let w = world();
        let peers = w.graph.peers_of(w.cleo);
        assert_eq!(peers, BTreeSet::from([w.ana, w.ben, w.dan]));
        assert_eq!(w.graph.peers_of(w.ana), BTreeSet::from([w.ben, w.cleo]));
        assert!(w.graph.peers_of(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn own_items_never_available() {
        let w = world();
        let items = vec![Res::new(w.ana), Res::new(w.ben)];
        let seen = available_items(&w.graph, w.ana, &items, &[], now());
        assert_eq!(seen.len(), 1);
        assert!(seen.iter().all(|i| i.owner != w.ana));
    }

    #[test]
    fn communities_isolate_visibility() {
        let w = world();
        let items = vec![Res::new(w.dan)];
        assert!(available_items(&w.graph, w.ana, &items, &[], now()).is_empty());
        assert_eq!(available_items(&w.graph, w.cleo, &items, &[], now()).len(), 1);
    }

    #[test]
    fn explicit_share_restricts_reach() {
        let w = world();
        let mut item = Res::new(w.cleo);
        item.all = false;
        item.shared_with = vec![w.office];
        let items = vec![item];

        assert!(available_items(&w.graph, w.ana, &items, &[], now()).is_empty());
        assert_eq!(available_items(&w.graph, w.dan, &items, &[], now()).len(), 1);
    }

    #[test]
    fn share_with_foreign_community_reaches_nobody() {
        let w = world();
        let mut item = Res::new(w.ana);
        item.all = false;
        item.shared_with = vec![w.office];
        let items = vec![item];

        assert!(w.graph.reach(w.ana, false, &items[0].shared_with).is_empty());
        assert!(available_items(&w.graph, w.dan, &items, &[], now()).is_empty());
        assert!(available_items(&w.graph, w.cleo, &items, &[], now()).is_empty());
    }

    #[test]
    fn inactive_items_hidden() {
        let w = world();
        let mut item = Res::new(w.ben);
        item.listed = false;
        assert!(available_items(&w.graph, w.ana, &[item], &[], now()).is_empty());
    }

    #[test]
    fn leases_ending_after_now_block_item() {
        let w = world();
        let items = vec![Res::new(w.ben), Res::new(w.ben), Res::new(w.ben)];
        let leases = [
            // ongoing
            LeaseEnd { item_id: items[0].id, end_date: now() + Duration::days(2) },
            // finished
            LeaseEnd { item_id: items[1].id, end_date: now() - Duration::days(1) },
            // ends exactly now
            LeaseEnd { item_id: items[2].id, end_date: now() },
        ];

        let seen: Vec<Uuid> = available_items(&w.graph, w.ana, &items, &leases, now())
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(seen, vec![items[1].id, items[2].id]);
    }

    #[test]
    fn subscriptions_already_shared_to_viewer_are_not_offered() {
        let w = world();
        let mut netflix = Res::new(w.ben);
        netflix.shared_to = vec![w.ana];
        let spotify = Res::new(w.ben);
        let subs = vec![netflix, spotify.clone()];

        let seen = available_subscriptions(&w.graph, w.ana, &subs, |s| &s.shared_to);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, spotify.id);

        let for_cleo = available_subscriptions(&w.graph, w.cleo, &subs, |s| &s.shared_to);
        assert_eq!(for_cleo.len(), 2);
    }

    #[test]
    fn leaving_a_community_revokes_reach() {
        let w = world();
        let mut item = Res::new(w.ana);
        item.all = false;
        item.shared_with = vec![w.street];
        let items = vec![item];

        let after = CommunityGraph::new([
            Membership { community_id: w.street, user_id: w.ben },
            Membership { community_id: w.street, user_id: w.cleo },
        ]);
        assert_eq!(available_items(&w.graph, w.ben, &items, &[], now()).len(), 1);
        assert!(available_items(&after, w.ben, &items, &[], now()).is_empty());
    }

    #[test]
    fn deleting_the_only_shared_community_hides_the_item() {
        let (owner, x_peer, y_peer) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let m = |community_id, user_id| Membership { community_id, user_id };

        let mut item = Res::new(owner);
        item.all = false;
        item.shared_with = vec![x];

        let before = CommunityGraph::new([m(x, owner), m(x, x_peer), m(y, owner), m(y, y_peer)]);
        assert_eq!(available_items(&before, x_peer, &[item.clone()], &[], now()).len(), 1);
        assert!(available_items(&before, y_peer, &[item.clone()], &[], now()).is_empty());

        // x is gone and its share rows cascaded away
        item.shared_with.clear();
        let after = CommunityGraph::new([m(y, owner), m(y, y_peer)]);
        assert!(available_items(&after, y_peer, &[item.clone()], &[], now()).is_empty());
        assert!(reach_is_empty(&after, &item));
    }

    fn reach_is_empty(graph: &CommunityGraph, r: &Res) -> bool {
        graph.reach(r.owner, r.all, &r.shared_with).is_empty()
    }

    #[test]
    fn shared_with_all_follows_owner_memberships() {
        let w = world();
        let items = vec![Res::new(w.cleo)];
        assert_eq!(available_items(&w.graph, w.ana, &items, &[], now()).len(), 1);
        assert_eq!(available_items(&w.graph, w.dan, &items, &[], now()).len(), 1);
    }
}
