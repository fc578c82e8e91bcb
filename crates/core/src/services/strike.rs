//! Strike engine and strike decay.
//!
//! Pure state transitions over a poster's enforcement fields. Callers
//! load the state, apply a transition, and persist the result; nothing
//! here touches the database.

use chrono::{DateTime, Duration, Utc};
use plaza_db::entities::moderation_action::ActionOutcome;

/// Days without a new strike before one strike heals.
const STRIKE_DECAY_DAYS: i64 = 60;

/// Strike total that triggers a permanent ban.
const BAN_THRESHOLD: i32 = 6;

/// A poster's enforcement state, as loaded from the user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterState {
    pub strikes: i32,
    pub strike_updated_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub is_banned: bool,
}

impl PosterState {
    /// Whether a posting cooldown is active at `now`.
    #[must_use]
    pub fn has_active_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }
}

/// Strike delta for a moderation outcome.
#[must_use]
pub const fn strike_delta(outcome: ActionOutcome) -> i32 {
    match outcome {
        ActionOutcome::Limited => 1,
        ActionOutcome::Removed => 2,
        ActionOutcome::Escalated => 3,
        ActionOutcome::NoAction => 0,
    }
}

/// Apply a strike delta and the cooldown ladder.
///
/// Returns `None` when nothing changes: a zero delta, or an
/// already-banned user (terminal state, skipped entirely).
///
/// The ladder matches on the exact resulting total, not a range, so a
/// delta of 2 or 3 can jump over an intermediate rung (two REMOVED
/// outcomes land a fresh user directly on the 7-day tier without ever
/// passing through the 24-hour tier).
#[must_use]
pub fn apply_strikes(
    state: &PosterState,
    outcome: ActionOutcome,
    now: DateTime<Utc>,
) -> Option<PosterState> {
    if state.is_banned {
        return None;
    }

    let delta = strike_delta(outcome);
    if delta == 0 {
        return None;
    }

    let strikes = state.strikes + delta;

    let (cooldown_until, is_banned) = match strikes {
        3 => (Some(now + Duration::hours(24)), false),
        4 => (Some(now + Duration::days(7)), false),
        5 => (Some(now + Duration::days(30)), false),
        n if n >= BAN_THRESHOLD => (None, true),
        _ => (state.cooldown_until, false),
    };

    Some(PosterState {
        strikes,
        strike_updated_at: Some(now),
        cooldown_until,
        is_banned,
    })
}

/// Heal at most one strike if the decay window has elapsed.
///
/// Eligible only when the user is not banned, has no active posting
/// cooldown, carries at least one strike, and has a decay anchor set.
/// At most one strike heals per invocation regardless of how many
/// windows have elapsed; the anchor resets to `now` on healing.
#[must_use]
pub fn decay_strikes(state: &PosterState, now: DateTime<Utc>) -> Option<PosterState> {
    if state.is_banned || state.strikes <= 0 || state.has_active_cooldown(now) {
        return None;
    }

    let anchor = state.strike_updated_at?;
    if now - anchor < Duration::days(STRIKE_DECAY_DAYS) {
        return None;
    }

    Some(PosterState {
        strikes: state.strikes - 1,
        strike_updated_at: Some(now),
        cooldown_until: state.cooldown_until,
        is_banned: false,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fresh() -> PosterState {
        PosterState {
            strikes: 0,
            strike_updated_at: None,
            cooldown_until: None,
            is_banned: false,
        }
    }

    #[test]
    fn test_strike_delta() {
        assert_eq!(strike_delta(ActionOutcome::NoAction), 0);
        assert_eq!(strike_delta(ActionOutcome::Limited), 1);
        assert_eq!(strike_delta(ActionOutcome::Removed), 2);
        assert_eq!(strike_delta(ActionOutcome::Escalated), 3);
    }

    #[test]
    fn test_no_action_is_noop() {
        let now = Utc::now();
        assert!(apply_strikes(&fresh(), ActionOutcome::NoAction, now).is_none());
    }

    #[test]
    fn test_banned_user_skipped() {
        let now = Utc::now();
        let mut state = fresh();
        state.is_banned = true;
        assert!(apply_strikes(&state, ActionOutcome::Escalated, now).is_none());
    }

    #[test]
    fn test_three_limited_hits_24h_cooldown_at_three() {
        let now = Utc::now();
        let mut state = fresh();

        state = apply_strikes(&state, ActionOutcome::Limited, now).unwrap();
        assert_eq!(state.strikes, 1);
        assert!(state.cooldown_until.is_none());

        state = apply_strikes(&state, ActionOutcome::Limited, now).unwrap();
        assert_eq!(state.strikes, 2);
        assert!(state.cooldown_until.is_none());

        state = apply_strikes(&state, ActionOutcome::Limited, now).unwrap();
        assert_eq!(state.strikes, 3);
        assert_eq!(state.cooldown_until, Some(now + Duration::hours(24)));
        assert!(!state.is_banned);
    }

    #[test]
    fn test_single_escalated_hits_24h_cooldown() {
        let now = Utc::now();
        let state = apply_strikes(&fresh(), ActionOutcome::Escalated, now).unwrap();
        assert_eq!(state.strikes, 3);
        assert_eq!(state.cooldown_until, Some(now + Duration::hours(24)));
    }

    #[test]
    fn test_two_removed_skips_24h_tier() {
        let now = Utc::now();
        let mut state = apply_strikes(&fresh(), ActionOutcome::Removed, now).unwrap();
        assert_eq!(state.strikes, 2);
        assert!(state.cooldown_until.is_none());

        state = apply_strikes(&state, ActionOutcome::Removed, now).unwrap();
        assert_eq!(state.strikes, 4);
        assert_eq!(state.cooldown_until, Some(now + Duration::days(7)));
    }

    #[test]
    fn test_ban_at_six_clears_cooldown() {
        let now = Utc::now();
        let mut state = fresh();
        state.strikes = 5;
        state.cooldown_until = Some(now + Duration::days(30));

        let state = apply_strikes(&state, ActionOutcome::Limited, now).unwrap();
        assert_eq!(state.strikes, 6);
        assert!(state.is_banned);
        assert!(state.cooldown_until.is_none());
    }

    #[test]
    fn test_jump_past_six() {
        let now = Utc::now();
        let mut state = fresh();
        state.strikes = 5;

        let state = apply_strikes(&state, ActionOutcome::Escalated, now).unwrap();
        assert_eq!(state.strikes, 8);
        assert!(state.is_banned);
    }

    #[test]
    fn test_decay_heals_one_strike() {
        let now = Utc::now();
        let state = PosterState {
            strikes: 2,
            strike_updated_at: Some(now - Duration::days(65)),
            cooldown_until: None,
            is_banned: false,
        };

        let healed = decay_strikes(&state, now).unwrap();
        assert_eq!(healed.strikes, 1);
        assert_eq!(healed.strike_updated_at, Some(now));
    }

    #[test]
    fn test_decay_single_step_even_after_multiple_windows() {
        let now = Utc::now();
        let state = PosterState {
            strikes: 4,
            strike_updated_at: Some(now - Duration::days(200)),
            cooldown_until: None,
            is_banned: false,
        };

        let healed = decay_strikes(&state, now).unwrap();
        assert_eq!(healed.strikes, 3);
    }

    #[test]
    fn test_decay_ineligible_before_window() {
        let now = Utc::now();
        let state = PosterState {
            strikes: 2,
            strike_updated_at: Some(now - Duration::days(59)),
            cooldown_until: None,
            is_banned: false,
        };
        assert!(decay_strikes(&state, now).is_none());
    }

    #[test]
    fn test_decay_ineligible_when_banned() {
        let now = Utc::now();
        let state = PosterState {
            strikes: 6,
            strike_updated_at: Some(now - Duration::days(365)),
            cooldown_until: None,
            is_banned: true,
        };
        assert!(decay_strikes(&state, now).is_none());
    }

    #[test]
    fn test_decay_ineligible_under_cooldown() {
        let now = Utc::now();
        let state = PosterState {
            strikes: 3,
            strike_updated_at: Some(now - Duration::days(90)),
            cooldown_until: Some(now + Duration::hours(2)),
            is_banned: false,
        };
        assert!(decay_strikes(&state, now).is_none());
    }
}
