//! Community repository.

use std::sync::Arc;

use crate::entities::{
    community, community_member, label_import_rule, Community, CommunityMember, LabelImportRule,
};
use plaza_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Community repository for database operations.
#[derive(Clone)]
pub struct CommunityRepository {
    db: Arc<DatabaseConnection>,
}

impl CommunityRepository {
    /// Create a new community repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get a community by ID, failing if absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<community::Model> {
        Community::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::CommunityNotFound(id.to_string()))
    }

    /// All community IDs, for the scheduled sweep.
    pub async fn find_all_ids(&self) -> AppResult<Vec<String>> {
        Community::find()
            .select_only()
            .column(community::Column::Id)
            .order_by_asc(community::Column::Id)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a membership row.
    pub async fn find_member(
        &self,
        community_id: &str,
        user_id: &str,
    ) -> AppResult<Option<community_member::Model>> {
        CommunityMember::find()
            .filter(community_member::Column::CommunityId.eq(community_id))
            .filter(community_member::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ========== Label Import Rules ==========

    /// All label import rules for a community.
    pub async fn find_rules(&self, community_id: &str) -> AppResult<Vec<label_import_rule::Model>> {
        LabelImportRule::find()
            .filter(label_import_rule::Column::CommunityId.eq(community_id))
            .order_by_asc(label_import_rule::Column::CategoryKey)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the rule for a (community, category) pair.
    pub async fn find_rule(
        &self,
        community_id: &str,
        category_key: &str,
    ) -> AppResult<Option<label_import_rule::Model>> {
        LabelImportRule::find()
            .filter(label_import_rule::Column::CommunityId.eq(community_id))
            .filter(label_import_rule::Column::CategoryKey.eq(category_key))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Rules importing any of the given categories, across communities.
    ///
    /// Used to compute which feeds a public post can flow into.
    pub async fn find_rules_for_categories(
        &self,
        category_keys: &[String],
    ) -> AppResult<Vec<label_import_rule::Model>> {
        if category_keys.is_empty() {
            return Ok(Vec::new());
        }

        LabelImportRule::find()
            .filter(label_import_rule::Column::CategoryKey.is_in(category_keys.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a label import rule.
    pub async fn create_rule(
        &self,
        model: label_import_rule::ActiveModel,
    ) -> AppResult<label_import_rule::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a label import rule.
    pub async fn update_rule(
        &self,
        model: label_import_rule::ActiveModel,
    ) -> AppResult<label_import_rule::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a label import rule by ID.
    pub async fn delete_rule(&self, id: &str) -> AppResult<()> {
        LabelImportRule::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
