//! Post repository.

use std::sync::Arc;

use crate::entities::{
    post::{self, Rating, Scope},
    post_like, Post, PostLike,
};
use plaza_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde_json::json;

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get a post by ID, failing if absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Non-removed posts inside a community, most recent first.
    pub async fn find_internal(
        &self,
        community_id: &str,
        limit: u64,
    ) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::CommunityId.eq(community_id))
            .filter(post::Column::IsRemoved.eq(false))
            .order_by_desc(post::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Non-removed external (public-pool) posts matching a category,
    /// restricted to the given scopes and optional rating, most recent
    /// first.
    pub async fn find_external(
        &self,
        category_key: &str,
        scopes: &[Scope],
        rating: Option<Rating>,
        limit: u64,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .filter(post::Column::CommunityId.is_null())
            .filter(post::Column::IsRemoved.eq(false))
            .filter(post::Column::Scope.is_in(scopes.iter().copied()))
            .filter(Expr::cust_with_values(
                "categories @> $1",
                [json!([category_key])],
            ));

        if let Some(rating) = rating {
            query = query.filter(post::Column::Rating.eq(rating));
        }

        query
            .order_by_desc(post::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ========== Likes ==========

    /// Find a like by user and post.
    pub async fn find_like(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> AppResult<Option<post_like::Model>> {
        PostLike::find()
            .filter(post_like::Column::UserId.eq(user_id))
            .filter(post_like::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a like.
    pub async fn create_like(&self, model: post_like::ActiveModel) -> AppResult<post_like::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a like by ID.
    pub async fn delete_like(&self, id: &str) -> AppResult<()> {
        PostLike::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically adjust the denormalized like count.
    pub async fn adjust_like_count(&self, post_id: &str, delta: i32) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::LikeCount,
                Expr::col(post::Column::LikeCount).add(delta),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::{community, Community};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            community_id: None,
            scope: Scope::Global,
            rating: Rating::Safe,
            categories: json!(["climate"]),
            is_removed: false,
            like_count: 0,
            country_code: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let post = create_test_post("post1", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post.clone()]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("post1").await.unwrap();

        assert_eq!(result.id, "post1");
        assert_eq!(result.category_keys(), vec!["climate".to_string()]);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    /// Posts resolve their home community through the entity relation.
    #[tokio::test]
    async fn test_find_with_home_community() {
        let mut post = create_test_post("post1", "user1");
        post.community_id = Some("comm1".to_string());
        let community = community::Model {
            id: "comm1".to_string(),
            name: "Climate Watch".to_string(),
            description: None,
            scope: Scope::Global,
            rating: Rating::Safe,
            country_code: None,
            categories: json!(["climate"]),
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[(post, community)]])
                .into_connection(),
        );

        let result = Post::find()
            .find_also_related(Community)
            .all(db.as_ref())
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        let (found, home) = &result[0];
        assert_eq!(found.community_id.as_deref(), Some("comm1"));
        assert_eq!(home.as_ref().unwrap().id, "comm1");
    }

    #[tokio::test]
    async fn test_find_internal() {
        let post = create_test_post("post1", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.find_internal("comm1", 200).await.unwrap();

        assert_eq!(result.len(), 1);
    }
}
