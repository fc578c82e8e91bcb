//! Moderation decision processing.
//!
//! A single decision fans out into an action record, a post mutation,
//! the author's strike ladder, resolution of every pending report, the
//! reporters' trust counters, and an audit entry. All of those writes
//! are assembled here and persisted atomically by the repository.

use chrono::{DateTime, Utc};
use plaza_common::{AppError, AppResult, IdGenerator};
use plaza_db::entities::community_member::MemberRole;
use plaza_db::entities::moderation_action::{self, ActionOutcome, Severity};
use plaza_db::entities::moderation_log::{self, ActorType};
use plaza_db::entities::post::{self, Rating};
use plaza_db::entities::report::{self, ReportStatus};
use plaza_db::entities::user;
use plaza_db::repositories::{
    CommunityRepository, DecisionWrite, ModerationRepository, PostRepository, UserRepository,
};
use sea_orm::Set;

use super::reporter_trust;
use super::strike;
use super::trigger::RankTrigger;
use super::trust::{poster_state, reporter_state};

/// Note keywords that force CRITICAL severity.
const CRITICAL_KEYWORDS: [&str; 2] = ["MINOR_SAFETY", "NSFW_EXPOSURE"];

/// How the acting moderator was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActorAuthority {
    Platform,
    Community,
}

/// Derive the decision's severity from outcome and note.
///
/// A note flagging minor safety or NSFW exposure overrides everything
/// else and classifies as CRITICAL.
#[must_use]
pub fn derive_severity(outcome: ActionOutcome, note: Option<&str>) -> Severity {
    if let Some(note) = note {
        if CRITICAL_KEYWORDS.iter().any(|kw| note.contains(kw)) {
            return Severity::Critical;
        }
    }

    match outcome {
        ActionOutcome::Removed | ActionOutcome::Escalated => Severity::High,
        ActionOutcome::Limited => Severity::Medium,
        ActionOutcome::NoAction => Severity::Low,
    }
}

/// Terminal report status implied by an outcome.
#[must_use]
pub const fn resolved_status(outcome: ActionOutcome) -> ReportStatus {
    match outcome {
        ActionOutcome::NoAction => ReportStatus::Rejected,
        ActionOutcome::Limited | ActionOutcome::Removed | ActionOutcome::Escalated => {
            ReportStatus::Confirmed
        }
    }
}

/// Service processing moderation decisions.
#[derive(Clone)]
pub struct ModerationService {
    moderation_repo: ModerationRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    community_repo: CommunityRepository,
    trigger: RankTrigger,
    id_gen: IdGenerator,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub fn new(
        moderation_repo: ModerationRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        community_repo: CommunityRepository,
        trigger: RankTrigger,
    ) -> Self {
        Self {
            moderation_repo,
            post_repo,
            user_repo,
            community_repo,
            trigger,
            id_gen: IdGenerator::new(),
        }
    }

    /// Process a moderation decision against a post.
    pub async fn decide(
        &self,
        post_id: &str,
        outcome: ActionOutcome,
        note: Option<String>,
        actor_id: &str,
    ) -> AppResult<()> {
        let now = Utc::now();
        let actor = self.user_repo.get_by_id(actor_id).await?;
        let post = self.post_repo.get_by_id(post_id).await?;

        let authority = self.authorize(&actor, &post).await?;

        // A removed post accepts nothing further except escalation.
        // Checked against the requested outcome, before any coercion.
        if post.is_removed && outcome != ActionOutcome::Escalated {
            return Err(AppError::Conflict(format!(
                "post {post_id} is removed and can only be escalated"
            )));
        }

        // Community-level moderators cannot finalize judgment on
        // already-NSFW content; their decision escalates to platform
        // review instead.
        let outcome = if authority == ActorAuthority::Community && post.rating == Rating::Nsfw {
            ActionOutcome::Escalated
        } else {
            outcome
        };

        let severity = derive_severity(outcome, note.as_deref());

        let action = moderation_action::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            moderator_id: Set(actor.id.clone()),
            outcome: Set(outcome),
            note: Set(note.clone()),
            created_at: Set(now.into()),
        };

        let post_update = Self::post_mutation(&post, outcome, now);
        let author_update = self.author_mutation(&post, outcome, now).await?;
        let (report_updates, reporter_updates) = self
            .resolve_reports(&post.id, outcome, severity, now)
            .await?;

        let actor_type = if actor.is_admin {
            ActorType::Admin
        } else {
            ActorType::Moderator
        };
        let log = moderation_log::ActiveModel {
            id: Set(self.id_gen.generate()),
            actor_id: Set(actor.id.clone()),
            actor_type: Set(actor_type),
            action: Set(format!("moderation.{}", outcome_name(outcome))),
            target_id: Set(post.id.clone()),
            reason: Set(note),
            created_at: Set(now.into()),
        };

        let rating_changed = post_update.is_some();
        self.moderation_repo
            .apply_decision(DecisionWrite {
                action,
                post_update,
                author_update,
                report_updates,
                reporter_updates,
                log,
            })
            .await?;

        tracing::info!(
            post_id,
            actor_id,
            outcome = outcome_name(outcome),
            "Moderation decision applied"
        );

        // Visibility or rating changes invalidate ranked snapshots.
        if rating_changed {
            self.trigger.rerank_for_post(post_id).await?;
        }

        Ok(())
    }

    /// Check the actor may moderate this post.
    async fn authorize(&self, actor: &user::Model, post: &post::Model) -> AppResult<ActorAuthority> {
        if actor.is_admin || actor.is_moderator {
            return Ok(ActorAuthority::Platform);
        }

        if let Some(community_id) = &post.community_id {
            let member = self.community_repo.find_member(community_id, &actor.id).await?;
            if member.is_some_and(|m| {
                matches!(m.role, MemberRole::Moderator | MemberRole::Admin)
            }) {
                return Ok(ActorAuthority::Community);
            }
        }

        Err(AppError::Forbidden(
            "moderation requires moderator privileges".to_string(),
        ))
    }

    /// Post mutation demanded by the outcome, if any.
    fn post_mutation(
        post: &post::Model,
        outcome: ActionOutcome,
        now: DateTime<Utc>,
    ) -> Option<post::ActiveModel> {
        let mut active: post::ActiveModel = post.clone().into();
        match outcome {
            ActionOutcome::Removed => {
                active.is_removed = Set(true);
            }
            ActionOutcome::Limited => {
                if post.rating == Rating::Nsfw {
                    return None;
                }
                active.rating = Set(Rating::Nsfw);
            }
            ActionOutcome::NoAction | ActionOutcome::Escalated => return None,
        }
        active.updated_at = Set(Some(now.into()));
        Some(active)
    }

    /// Author strike-ladder mutation, if the outcome carries strikes.
    async fn author_mutation(
        &self,
        post: &post::Model,
        outcome: ActionOutcome,
        now: DateTime<Utc>,
    ) -> AppResult<Option<user::ActiveModel>> {
        let author = self.user_repo.get_by_id(&post.author_id).await?;

        let Some(next) = strike::apply_strikes(&poster_state(&author), outcome, now) else {
            return Ok(None);
        };

        if next.is_banned {
            tracing::warn!(author_id = %author.id, strikes = next.strikes, "Author banned by strike ladder");
        }

        let mut active: user::ActiveModel = author.into();
        active.nsfw_strikes = Set(next.strikes);
        active.strike_updated_at = Set(next.strike_updated_at.map(Into::into));
        active.cooldown_until = Set(next.cooldown_until.map(Into::into));
        active.is_banned = Set(next.is_banned);
        active.updated_at = Set(Some(now.into()));
        Ok(Some(active))
    }

    /// Resolve all pending reports and compute reporter trust updates.
    async fn resolve_reports(
        &self,
        post_id: &str,
        outcome: ActionOutcome,
        severity: Severity,
        now: DateTime<Utc>,
    ) -> AppResult<(Vec<report::ActiveModel>, Vec<user::ActiveModel>)> {
        let pending = self.moderation_repo.find_pending_reports(post_id).await?;
        let status = resolved_status(outcome);

        let mut report_updates = Vec::with_capacity(pending.len());
        let mut reporter_updates = Vec::new();

        for pending_report in pending {
            let reporter_id = pending_report.reporter_id.clone();

            let mut active: report::ActiveModel = pending_report.into();
            active.status = Set(status);
            active.resolved_at = Set(Some(now.into()));
            report_updates.push(active);

            let reporter = self.user_repo.get_by_id(&reporter_id).await?;

            // Minors' reports resolve, but their trust state is never
            // scored.
            if reporter.is_minor {
                continue;
            }

            let mut confirmed = reporter.reports_confirmed;
            let mut rejected = reporter.reports_rejected;
            match status {
                ReportStatus::Confirmed => confirmed += 1,
                ReportStatus::Rejected => rejected += 1,
                ReportStatus::Pending => {}
            }
            let accuracy = reporter_trust::accuracy(confirmed, reporter.reports_submitted);

            let mut active: user::ActiveModel = reporter.clone().into();
            active.reports_confirmed = Set(confirmed);
            active.reports_rejected = Set(rejected);
            active.report_accuracy = Set(accuracy);

            if status == ReportStatus::Rejected {
                active.last_rejected_at = Set(Some(now.into()));
                active.last_rejected_severity = Set(Some(severity));

                // Low-accuracy reporters earn a reporting cooldown when
                // their report comes back NO_ACTION.
                let mut state = reporter_state(&reporter);
                state.accuracy = accuracy;
                state.rejected = rejected;
                if let Some(until) =
                    reporter_trust::propose_cooldown(&state, Some(severity), now)
                {
                    active.report_cooldown_until = Set(Some(until.into()));
                    tracing::info!(
                        reporter_id,
                        until = %until,
                        "Reporting cooldown imposed"
                    );
                }
            }

            active.updated_at = Set(Some(now.into()));
            reporter_updates.push(active);
        }

        Ok((report_updates, reporter_updates))
    }
}

const fn outcome_name(outcome: ActionOutcome) -> &'static str {
    match outcome {
        ActionOutcome::NoAction => "no_action",
        ActionOutcome::Limited => "limited",
        ActionOutcome::Removed => "removed",
        ActionOutcome::Escalated => "escalated",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::feed::FeedService;
    use crate::services::trigger::RebuildQueue;
    use chrono::Utc;
    use plaza_db::entities::{community_member, post::Scope};
    use plaza_db::repositories::FeedRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use serde_json::json;
    use std::sync::Arc;

    fn test_service(db: &Arc<DatabaseConnection>) -> ModerationService {
        let trigger = RankTrigger::new(
            RebuildQueue::spawn(FeedService::new(
                CommunityRepository::new(Arc::clone(db)),
                PostRepository::new(Arc::clone(db)),
                FeedRepository::new(Arc::clone(db)),
            )),
            CommunityRepository::new(Arc::clone(db)),
            PostRepository::new(Arc::clone(db)),
        );
        ModerationService::new(
            ModerationRepository::new(Arc::clone(db)),
            PostRepository::new(Arc::clone(db)),
            UserRepository::new(Arc::clone(db)),
            CommunityRepository::new(Arc::clone(db)),
            trigger,
        )
    }

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user-{id}"),
            country_code: None,
            is_minor: false,
            is_admin: false,
            is_moderator: false,
            nsfw_strikes: 0,
            strike_updated_at: None,
            cooldown_until: None,
            is_banned: false,
            reports_submitted: 0,
            reports_confirmed: 0,
            reports_rejected: 0,
            report_accuracy: 0.0,
            report_cooldown_until: None,
            last_rejected_at: None,
            last_rejected_severity: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_post(id: &str, community_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: "author1".to_string(),
            community_id: Some(community_id.to_string()),
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

    fn test_member(community_id: &str, user_id: &str, role: MemberRole) -> community_member::Model {
        community_member::Model {
            id: format!("member-{user_id}"),
            community_id: community_id.to_string(),
            user_id: user_id.to_string(),
            role,
            created_at: Utc::now().into(),
        }
    }

    /// A removed post rejects everything but escalation, judged on the
    /// requested outcome. A community moderator asking LIMITED on a
    /// removed NSFW post must hit the Conflict, not get coerced to
    /// ESCALATED and slip past it.
    #[tokio::test]
    async fn test_removed_post_locked_against_requested_outcome() {
        let actor = test_user("mod1");
        let mut post = test_post("post1", "comm1");
        post.is_removed = true;
        post.rating = Rating::Nsfw;
        let member = test_member("comm1", "mod1", MemberRole::Moderator);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[actor]])
                .append_query_results([[post]])
                .append_query_results([[member]])
                .into_connection(),
        );

        let service = test_service(&db);
        let result = service
            .decide("post1", ActionOutcome::Limited, None, "mod1")
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_derive_severity_from_outcome() {
        assert_eq!(derive_severity(ActionOutcome::NoAction, None), Severity::Low);
        assert_eq!(
            derive_severity(ActionOutcome::Limited, None),
            Severity::Medium
        );
        assert_eq!(derive_severity(ActionOutcome::Removed, None), Severity::High);
        assert_eq!(
            derive_severity(ActionOutcome::Escalated, None),
            Severity::High
        );
    }

    #[test]
    fn test_derive_severity_note_keywords_override() {
        assert_eq!(
            derive_severity(ActionOutcome::NoAction, Some("possible MINOR_SAFETY issue")),
            Severity::Critical
        );
        assert_eq!(
            derive_severity(ActionOutcome::Limited, Some("NSFW_EXPOSURE in thumbnail")),
            Severity::Critical
        );
        assert_eq!(
            derive_severity(ActionOutcome::Limited, Some("borderline")),
            Severity::Medium
        );
    }

    #[test]
    fn test_resolved_status() {
        assert_eq!(
            resolved_status(ActionOutcome::NoAction),
            ReportStatus::Rejected
        );
        assert_eq!(
            resolved_status(ActionOutcome::Limited),
            ReportStatus::Confirmed
        );
        assert_eq!(
            resolved_status(ActionOutcome::Escalated),
            ReportStatus::Confirmed
        );
    }
}
