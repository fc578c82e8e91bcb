//! Reporter trust: accuracy, cooldown policy, and accuracy decay.
//!
//! One authoritative cooldown policy serves both the moderation
//! resolution path and the report creation path. All functions are
//! pure; persistence happens in the calling service.

use chrono::{DateTime, Duration, Utc};
use plaza_db::entities::moderation_action::Severity;

/// Accuracy heal per 30-day window, before severity scaling.
const ACCURACY_HEAL_STEP: f64 = 0.05;

/// A reporter's trust state, as loaded from the user record.
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterState {
    pub submitted: i32,
    pub confirmed: i32,
    pub rejected: i32,
    pub accuracy: f64,
    pub report_cooldown_until: Option<DateTime<Utc>>,
    pub last_rejected_at: Option<DateTime<Utc>>,
    pub last_rejected_severity: Option<Severity>,
    pub is_minor: bool,
    pub is_banned: bool,
}

impl ReporterState {
    /// Whether a reporting cooldown is active at `now`.
    #[must_use]
    pub fn has_active_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.report_cooldown_until.is_some_and(|until| until > now)
    }
}

/// confirmed / max(1, submitted), clamped to [0, 1].
#[must_use]
pub fn accuracy(confirmed: i32, submitted: i32) -> f64 {
    let denominator = f64::from(submitted.max(1));
    (f64::from(confirmed) / denominator).clamp(0.0, 1.0)
}

/// Derived weighting signal for a reporter.
///
/// Minors always weigh 1.0; everyone else weighs their accuracy
/// clamped to [0.2, 1.5]. Computed as an available extension point;
/// not wired into feed ranking.
#[must_use]
pub fn report_weight(is_minor: bool, accuracy: f64) -> f64 {
    if is_minor {
        1.0
    } else {
        accuracy.clamp(0.2, 1.5)
    }
}

/// Cooldown scaling for the severity-dependent tier.
#[must_use]
pub const fn severity_cooldown(severity: Severity) -> Duration {
    match severity {
        Severity::Low | Severity::Medium => Duration::hours(24),
        Severity::High => Duration::days(3),
        Severity::Critical => Duration::days(7),
    }
}

/// Accuracy heal multiplier: more severe false accusations heal slower.
#[must_use]
pub const fn severity_multiplier(severity: Severity) -> f64 {
    match severity {
        Severity::Low => 1.0,
        Severity::Medium => 0.6,
        Severity::High => 0.3,
        Severity::Critical => 0.1,
    }
}

/// The authoritative reporting-abuse cooldown policy.
///
/// Tiers, first match wins:
/// 1. accuracy < 0.2 with at least 12 submitted: 30 days
/// 2. accuracy < 0.3 with at least 8 submitted: 7 days
/// 3. accuracy < 0.3 with at least 5 submitted and a triggering
///    severity (moderation resolution path only): severity-scaled
/// 4. accuracy < 0.5 with at least 5 submitted: 1 day
///
/// `severity` is `None` on the creation-time path, which skips tier 3.
#[must_use]
pub fn cooldown_for(
    accuracy: f64,
    submitted: i32,
    severity: Option<Severity>,
) -> Option<Duration> {
    if accuracy < 0.2 && submitted >= 12 {
        return Some(Duration::days(30));
    }
    if accuracy < 0.3 && submitted >= 8 {
        return Some(Duration::days(7));
    }
    if accuracy < 0.3 && submitted >= 5 {
        if let Some(severity) = severity {
            return Some(severity_cooldown(severity));
        }
    }
    if accuracy < 0.5 && submitted >= 5 {
        return Some(Duration::days(1));
    }
    None
}

/// Propose a new cooldown expiry, never shortening an existing one.
///
/// Minors are exempt unconditionally, and an already-active cooldown is
/// left untouched.
#[must_use]
pub fn propose_cooldown(
    state: &ReporterState,
    severity: Option<Severity>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if state.is_minor || state.has_active_cooldown(now) {
        return None;
    }

    let duration = cooldown_for(state.accuracy, state.submitted, severity)?;
    let proposed = now + duration;

    match state.report_cooldown_until {
        Some(existing) if existing >= proposed => None,
        _ => Some(proposed),
    }
}

/// Heal report accuracy based on time since the last rejected report.
///
/// One step per full 30 days elapsed; each step heals 0.05 scaled by
/// the severity multiplier, capped at 1.0. The anchor resets to `now` on
/// healing. Ineligible while banned, under an active reporting
/// cooldown, already at full accuracy, or without an anchor.
#[must_use]
pub fn decay_accuracy(state: &ReporterState, now: DateTime<Utc>) -> Option<ReporterState> {
    if state.is_banned || state.accuracy >= 1.0 || state.has_active_cooldown(now) {
        return None;
    }

    let anchor = state.last_rejected_at?;
    let steps = (now - anchor).num_days() / 30;
    if steps < 1 {
        return None;
    }

    let multiplier = severity_multiplier(state.last_rejected_severity.unwrap_or(Severity::Low));
    let healed = (state.accuracy + steps as f64 * ACCURACY_HEAL_STEP * multiplier).min(1.0);

    Some(ReporterState {
        accuracy: healed,
        last_rejected_at: Some(now),
        ..state.clone()
    })
}
