//! Re-rank triggering.
//!
//! Ranked feeds are snapshots, so score changes do not update them in
//! place. Events that move scores enqueue full rebuilds of the affected
//! communities' current snapshots; the queue coalesces bursts so each
//! (community, date) key rebuilds at most once per drain.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use plaza_common::AppResult;
use plaza_db::entities::post;
use plaza_db::repositories::{CommunityRepository, PostRepository};
use tokio::sync::{mpsc, Mutex};

use super::feed::FeedService;

/// A single snapshot rebuild request.
pub type RebuildKey = (String, NaiveDate);

/// Coalescing queue of snapshot rebuilds.
///
/// At most one pending entry per key: enqueueing a key that is already
/// pending is a no-op. The worker drains keys sequentially, removing a
/// key from the pending set before its rebuild starts so a score change
/// arriving mid-rebuild schedules a fresh one.
#[derive(Clone)]
pub struct RebuildQueue {
    tx: mpsc::UnboundedSender<RebuildKey>,
    pending: Arc<Mutex<HashSet<RebuildKey>>>,
}

impl RebuildQueue {
    /// Create the queue and spawn its worker task.
    #[must_use]
    pub fn spawn(feed_service: FeedService) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<RebuildKey>();
        let pending = Arc::new(Mutex::new(HashSet::new()));

        let worker_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(key) = rx.recv().await {
                worker_pending.lock().await.remove(&key);

                let (community_id, feed_date) = key;
                if let Err(e) = feed_service
                    .materialize(&community_id, Some(feed_date))
                    .await
                {
                    tracing::error!(
                        community_id,
                        %feed_date,
                        error = %e,
                        "Queued feed rebuild failed"
                    );
                }
            }
        });

        Self { tx, pending }
    }

    /// Enqueue a rebuild; coalesces with an already-pending key.
    pub async fn enqueue(&self, community_id: String, feed_date: NaiveDate) {
        let key = (community_id, feed_date);

        let mut pending = self.pending.lock().await;
        if !pending.insert(key.clone()) {
            return;
        }
        drop(pending);

        if self.tx.send(key).is_err() {
            tracing::warn!("Rebuild queue worker is gone; dropping rebuild request");
        }
    }

    /// Number of keys currently pending.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Computes which communities a changed post affects and enqueues
/// their rebuilds.
#[derive(Clone)]
pub struct RankTrigger {
    queue: RebuildQueue,
    community_repo: CommunityRepository,
    post_repo: PostRepository,
}

impl RankTrigger {
    /// Create a new trigger.
    #[must_use]
    pub const fn new(
        queue: RebuildQueue,
        community_repo: CommunityRepository,
        post_repo: PostRepository,
    ) -> Self {
        Self {
            queue,
            community_repo,
            post_repo,
        }
    }

    /// Enqueue today's snapshot rebuild for every community the post
    /// can appear in.
    pub async fn rerank_for_post(&self, post_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let communities = self.affected_communities(&post).await?;
        let today = FeedService::today();

        for community_id in communities {
            self.queue.enqueue(community_id, today).await;
        }
        Ok(())
    }

    /// A community whose import rules changed rebuilds on its own.
    pub async fn community_changed(&self, community_id: &str) {
        self.queue
            .enqueue(community_id.to_string(), FeedService::today())
            .await;
    }

    /// Communities affected by a post: its home community plus every
    /// community importing one of its categories at its scope.
    async fn affected_communities(&self, post: &post::Model) -> AppResult<Vec<String>> {
        let mut affected = HashSet::new();

        if let Some(community_id) = &post.community_id {
            affected.insert(community_id.clone());
        }

        let rules = self
            .community_repo
            .find_rules_for_categories(&post.category_keys())
            .await?;
        for rule in rules {
            if rule.allows_scope(post.scope) {
                affected.insert(rule.community_id);
            }
        }

        Ok(affected.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use plaza_db::entities::feed_snapshot_item;
    use plaza_db::repositories::FeedRepository;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn idle_queue() -> RebuildQueue {
        // A queue whose worker never finds its communities; rebuild
        // failures are logged and do not affect enqueue semantics.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<feed_snapshot_item::Model>::new()])
                .into_connection(),
        );
        RebuildQueue::spawn(FeedService::new(
            CommunityRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            FeedRepository::new(db),
        ))
    }

    #[tokio::test]
    async fn test_enqueue_coalesces_duplicate_keys() {
        let queue = idle_queue();
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        // Hold the worker out of the picture by filling pending
        // directly through the public API in quick succession.
        queue.pending.lock().await.insert(("warm".to_string(), date));

        queue.enqueue("warm".to_string(), date).await;
        queue.enqueue("cold".to_string(), date).await;
        queue.enqueue("cold".to_string(), date).await;

        // "warm" was already pending and "cold" coalesced, so exactly
        // two keys remain.
        assert_eq!(queue.pending_len().await, 2);
    }

    #[tokio::test]
    async fn test_distinct_dates_are_distinct_keys() {
        let queue = idle_queue();
        let d1 = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        queue.pending.lock().await.insert(("comm1".to_string(), d1));
        queue.enqueue("comm1".to_string(), d2).await;

        assert_eq!(queue.pending_len().await, 2);
    }
}
