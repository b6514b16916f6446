use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::rules::{CommunityGraph, Membership};

/// Membership snapshot of every active community `viewer` belongs to.
///
/// Memberships of communities the viewer is not in cannot affect what the
/// viewer sees, so they are not loaded.
pub async fn load_graph(db: &PgPool, viewer: Uuid) -> anyhow::Result<CommunityGraph> {
    let rows = sqlx::query_as::<_, Membership>(
        r#"
        SELECT m.community_id, m.user_id
          FROM community_members m
          JOIN communities c ON c.id = m.community_id
         WHERE c.is_active
           AND m.community_id IN (
               SELECT community_id FROM community_members WHERE user_id = $1
           )
        "#,
    )
    .bind(viewer)
    .fetch_all(db)
    .await
    .context("load community graph")?;
    Ok(CommunityGraph::new(rows))
}

/// Snapshot of every active community. Used by batch jobs that evaluate many viewers.
pub async fn load_full_graph(db: &PgPool) -> anyhow::Result<CommunityGraph> {
    let rows = sqlx::query_as::<_, Membership>(
        r#"
        SELECT m.community_id, m.user_id
          FROM community_members m
          JOIN communities c ON c.id = m.community_id
         WHERE c.is_active
        "#,
    )
    .fetch_all(db)
    .await
    .context("load full community graph")?;
    Ok(CommunityGraph::new(rows))
}
