//! Feed snapshot repository.
//!
//! Snapshot rows for a (community, date) are replaced wholesale inside
//! one transaction so readers never observe a half-written feed.

use std::sync::Arc;

use crate::entities::{feed_snapshot_item, FeedSnapshotItem};
use chrono::NaiveDate;
use plaza_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};

/// Feed snapshot repository for database operations.
#[derive(Clone)]
pub struct FeedRepository {
    db: Arc<DatabaseConnection>,
}

impl FeedRepository {
    /// Create a new feed repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Atomically replace the snapshot for a (community, date).
    pub async fn replace_snapshot(
        &self,
        community_id: &str,
        feed_date: NaiveDate,
        items: Vec<feed_snapshot_item::ActiveModel>,
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        FeedSnapshotItem::delete_many()
            .filter(feed_snapshot_item::Column::CommunityId.eq(community_id))
            .filter(feed_snapshot_item::Column::FeedDate.eq(feed_date))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !items.is_empty() {
            FeedSnapshotItem::insert_many(items)
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Page of snapshot items with rank strictly greater than the
    /// cursor, ascending by rank.
    pub async fn find_page(
        &self,
        community_id: &str,
        feed_date: NaiveDate,
        cursor_rank: Option<i32>,
        limit: u64,
    ) -> AppResult<Vec<feed_snapshot_item::Model>> {
        let mut query = FeedSnapshotItem::find()
            .filter(feed_snapshot_item::Column::CommunityId.eq(community_id))
            .filter(feed_snapshot_item::Column::FeedDate.eq(feed_date));

        if let Some(rank) = cursor_rank {
            query = query.filter(feed_snapshot_item::Column::Rank.gt(rank));
        }

        query
            .order_by_asc(feed_snapshot_item::Column::Rank)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::feed_snapshot_item::ItemSource;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_item(id: &str, community_id: &str, rank: i32) -> feed_snapshot_item::Model {
        feed_snapshot_item::Model {
            id: id.to_string(),
            community_id: community_id.to_string(),
            post_id: format!("post-{rank}"),
            feed_date: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            rank,
            score: 10 - rank,
            source: ItemSource::Internal,
            matched_label: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_page_orders_by_rank() {
        let item1 = create_test_item("item1", "comm1", 1);
        let item2 = create_test_item("item2", "comm1", 2);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[item1, item2]])
                .into_connection(),
        );

        let repo = FeedRepository::new(db);
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let result = repo.find_page("comm1", date, None, 20).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].rank, 1);
        assert_eq!(result[1].rank, 2);
    }
}
