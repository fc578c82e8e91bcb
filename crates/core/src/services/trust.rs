//! Trust service: lazy per-request decay of enforcement state.
//!
//! Decay runs opportunistically when a user acts, never as a
//! background sweep. A dormant user's clocks only advance on their
//! next request.

use chrono::{DateTime, Utc};
use plaza_common::AppResult;
use plaza_db::entities::user;
use plaza_db::repositories::UserRepository;
use sea_orm::Set;

use super::reporter_trust::{self, ReporterState};
use super::strike::{self, PosterState};

/// Poster enforcement state from a user record.
#[must_use]
pub fn poster_state(user: &user::Model) -> PosterState {
    PosterState {
        strikes: user.nsfw_strikes,
        strike_updated_at: user.strike_updated_at.map(Into::into),
        cooldown_until: user.cooldown_until.map(Into::into),
        is_banned: user.is_banned,
    }
}

/// Reporter trust state from a user record.
#[must_use]
pub fn reporter_state(user: &user::Model) -> ReporterState {
    ReporterState {
        submitted: user.reports_submitted,
        confirmed: user.reports_confirmed,
        rejected: user.reports_rejected,
        accuracy: user.report_accuracy,
        report_cooldown_until: user.report_cooldown_until.map(Into::into),
        last_rejected_at: user.last_rejected_at.map(Into::into),
        last_rejected_severity: user.last_rejected_severity,
        is_minor: user.is_minor,
        is_banned: user.is_banned,
    }
}

/// Service applying lazy decay to a user's trust state.
#[derive(Clone)]
pub struct TrustService {
    user_repo: UserRepository,
}

impl TrustService {
    /// Create a new trust service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Load a user and apply any due strike/accuracy decay.
    ///
    /// Returns the refreshed record; persists only when something
    /// actually healed.
    pub async fn refresh(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;

        let strike_update = strike::decay_strikes(&poster_state(&user), now);
        let accuracy_update = reporter_trust::decay_accuracy(&reporter_state(&user), now);

        if strike_update.is_none() && accuracy_update.is_none() {
            return Ok(user);
        }

        let mut active: user::ActiveModel = user.clone().into();

        if let Some(healed) = strike_update {
            tracing::debug!(
                user_id,
                strikes = healed.strikes,
                "Strike decay healed one strike"
            );
            active.nsfw_strikes = Set(healed.strikes);
            active.strike_updated_at = Set(healed.strike_updated_at.map(Into::into));
        }

        if let Some(healed) = accuracy_update {
            tracing::debug!(
                user_id,
                accuracy = healed.accuracy,
                "Report accuracy decay applied"
            );
            active.report_accuracy = Set(healed.accuracy);
            active.last_rejected_at = Set(healed.last_rejected_at.map(Into::into));
        }

        active.updated_at = Set(Some(now.into()));

        self.user_repo.update(active).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use plaza_db::entities::moderation_action::Severity;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str) -> user::Model {
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

    #[tokio::test]
    async fn test_refresh_noop_without_due_decay() {
        let user = create_test_user("user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let service = TrustService::new(UserRepository::new(db));
        let result = service.refresh("user1", Utc::now()).await.unwrap();

        assert_eq!(result.nsfw_strikes, 0);
    }

    #[tokio::test]
    async fn test_refresh_decays_stale_strike() {
        let now = Utc::now();
        let mut user = create_test_user("user1");
        user.nsfw_strikes = 2;
        user.strike_updated_at = Some((now - Duration::days(65)).into());

        let mut healed = user.clone();
        healed.nsfw_strikes = 1;
        healed.strike_updated_at = Some(now.into());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user], [healed]])
                .into_connection(),
        );

        let service = TrustService::new(UserRepository::new(db));
        let result = service.refresh("user1", now).await.unwrap();

        assert_eq!(result.nsfw_strikes, 1);
    }

    #[test]
    fn test_reporter_state_mapping() {
        let mut user = create_test_user("user1");
        user.reports_submitted = 7;
        user.reports_confirmed = 3;
        user.last_rejected_severity = Some(Severity::High);

        let state = reporter_state(&user);
        assert_eq!(state.submitted, 7);
        assert_eq!(state.confirmed, 3);
        assert_eq!(state.last_rejected_severity, Some(Severity::High));
    }
}
