//! Report creation.
//!
//! Applies the reporter-side trust gates and the creation-time branch
//! of the consolidated cooldown policy.

use chrono::Utc;
use plaza_common::{AppError, AppResult, IdGenerator};
use plaza_db::entities::report::{self, ReportStatus};
use plaza_db::entities::user;
use plaza_db::repositories::{ModerationRepository, PostRepository, UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::reporter_trust;
use super::trust::{reporter_state, TrustService};

/// Input for filing a report.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    /// Reporting user.
    pub reporter_id: String,
    /// Reported post.
    pub post_id: String,
    /// Short machine-readable reason.
    #[validate(length(min = 1, max = 64))]
    pub reason: String,
    /// Free-form context.
    #[validate(length(max = 2000))]
    pub context: Option<String>,
}

/// Service for filing reports.
#[derive(Clone)]
pub struct ReportService {
    moderation_repo: ModerationRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    trust: TrustService,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub fn new(
        moderation_repo: ModerationRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        trust: TrustService,
    ) -> Self {
        Self {
            moderation_repo,
            post_repo,
            user_repo,
            trust,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a report against a post.
    pub async fn create_report(&self, input: CreateReportInput) -> AppResult<report::Model> {
        input.validate()?;

        let now = Utc::now();
        let reporter = self.trust.refresh(&input.reporter_id, now).await?;
        let state = reporter_state(&reporter);

        if state.is_banned {
            return Err(AppError::Forbidden("reporter is banned".to_string()));
        }
        if state.has_active_cooldown(now) {
            return Err(AppError::Forbidden(
                "reporter is under a reporting cooldown".to_string(),
            ));
        }

        let post = self.post_repo.get_by_id(&input.post_id).await?;
        if post.author_id == reporter.id {
            return Err(AppError::BadRequest(
                "cannot report your own post".to_string(),
            ));
        }
        if post.is_removed {
            return Err(AppError::Conflict("post is already removed".to_string()));
        }

        if self
            .moderation_repo
            .find_report_by_reporter_and_post(&reporter.id, &post.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "post already reported by this user".to_string(),
            ));
        }

        let created = self
            .moderation_repo
            .create_report(report::ActiveModel {
                id: Set(self.id_gen.generate()),
                reporter_id: Set(reporter.id.clone()),
                post_id: Set(post.id.clone()),
                reason: Set(input.reason),
                context: Set(input.context),
                status: Set(ReportStatus::Pending),
                created_at: Set(now.into()),
                resolved_at: Set(None),
            })
            .await?;

        // Count the submission immediately; accuracy moves with it, and
        // the volume-based cooldown tiers may fire right here.
        let submitted = reporter.reports_submitted + 1;
        let accuracy = reporter_trust::accuracy(reporter.reports_confirmed, submitted);

        let mut active: user::ActiveModel = reporter.clone().into();
        active.reports_submitted = Set(submitted);
        active.report_accuracy = Set(accuracy);

        let mut updated_state = reporter_state(&reporter);
        updated_state.submitted = submitted;
        updated_state.accuracy = accuracy;
        if let Some(until) = reporter_trust::propose_cooldown(&updated_state, None, now) {
            active.report_cooldown_until = Set(Some(until.into()));
            tracing::info!(
                reporter_id = %reporter.id,
                until = %until,
                "Reporting cooldown imposed at submission"
            );
        }

        active.updated_at = Set(Some(now.into()));
        self.user_repo.update(active).await?;

        tracing::debug!(report_id = %created.id, post_id = %created.post_id, "Report filed");

        Ok(created)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_report_input_validates_reason() {
        let input = CreateReportInput {
            reporter_id: "user1".to_string(),
            post_id: "post1".to_string(),
            reason: String::new(),
            context: None,
        };
        assert!(input.validate().is_err());

        let input = CreateReportInput {
            reason: "nsfw".to_string(),
            ..input
        };
        assert!(input.validate().is_ok());
    }
}
