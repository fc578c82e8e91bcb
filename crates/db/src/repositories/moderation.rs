//! Moderation repository for actions, reports, and the audit log.

use std::sync::Arc;

use crate::entities::{
    moderation_action, moderation_log, post, report, report::ReportStatus, user, Report,
};
use plaza_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

/// Every write produced by one moderation decision.
///
/// Either all of it lands or none of it does: a failure on the Nth
/// reporter must not leave earlier reporters updated.
pub struct DecisionWrite {
    /// Immutable action record.
    pub action: moderation_action::ActiveModel,
    /// Post visibility/rating mutation, when the outcome demands one.
    pub post_update: Option<post::ActiveModel>,
    /// Author strike/cooldown/ban mutation.
    pub author_update: Option<user::ActiveModel>,
    /// Pending reports resolved by this decision.
    pub report_updates: Vec<report::ActiveModel>,
    /// Reporter counter/accuracy/cooldown mutations.
    pub reporter_updates: Vec<user::ActiveModel>,
    /// Audit log entry.
    pub log: moderation_log::ActiveModel,
}

/// Moderation repository for database operations.
#[derive(Clone)]
pub struct ModerationRepository {
    db: Arc<DatabaseConnection>,
}

impl ModerationRepository {
    /// Create a new moderation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a full moderation decision in one transaction.
    pub async fn apply_decision(&self, write: DecisionWrite) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        write
            .action
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(post_update) = write.post_update {
            post_update
                .update(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        if let Some(author_update) = write.author_update {
            author_update
                .update(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        for report_update in write.report_updates {
            report_update
                .update(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        for reporter_update in write.reporter_updates {
            reporter_update
                .update(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        write
            .log
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ========== Reports ==========

    /// Create a report.
    pub async fn create_report(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a report by (reporter, post); at most one exists.
    pub async fn find_report_by_reporter_and_post(
        &self,
        reporter_id: &str,
        post_id: &str,
    ) -> AppResult<Option<report::Model>> {
        Report::find()
            .filter(report::Column::ReporterId.eq(reporter_id))
            .filter(report::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending reports against a post, oldest first.
    pub async fn find_pending_reports(&self, post_id: &str) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::PostId.eq(post_id))
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .order_by_asc(report::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_report(id: &str, reporter_id: &str, post_id: &str) -> report::Model {
        report::Model {
            id: id.to_string(),
            reporter_id: reporter_id.to_string(),
            post_id: post_id.to_string(),
            reason: "nsfw".to_string(),
            context: None,
            status: ReportStatus::Pending,
            created_at: Utc::now().into(),
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_pending_reports() {
        let report1 = create_test_report("report1", "user1", "post1");
        let report2 = create_test_report("report2", "user2", "post1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[report1, report2]])
                .into_connection(),
        );

        let repo = ModerationRepository::new(db);
        let result = repo.find_pending_reports("post1").await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_report_by_reporter_and_post() {
        let report = create_test_report("report1", "user1", "post1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[report]])
                .into_connection(),
        );

        let repo = ModerationRepository::new(db);
        let result = repo
            .find_report_by_reporter_and_post("user1", "post1")
            .await
            .unwrap();

        assert!(result.is_some());
    }
}
