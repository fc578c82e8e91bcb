//! User entity.
//!
//! Trust and enforcement state lives directly on the user record as
//! counters and timestamps. Only the strike/trust engines may write
//! these fields.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::moderation_action::Severity;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    /// ISO 3166-1 alpha-2 country code
    #[sea_orm(nullable)]
    pub country_code: Option<String>,

    /// Minors are never penalized as reporters and always weigh 1.0
    #[sea_orm(default_value = false)]
    pub is_minor: bool,

    /// Platform administrator
    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    /// Platform-wide moderator
    #[sea_orm(default_value = false)]
    pub is_moderator: bool,

    // === Strike / posting enforcement ===
    /// Accumulated NSFW strikes; monotonic except decay and never
    /// reduced once banned
    #[sea_orm(default_value = 0)]
    pub nsfw_strikes: i32,

    /// Strike decay anchor; reset on every strike delta and every heal
    #[sea_orm(nullable)]
    pub strike_updated_at: Option<DateTimeWithTimeZone>,

    /// Posting cooldown expiry
    #[sea_orm(nullable)]
    pub cooldown_until: Option<DateTimeWithTimeZone>,

    /// Terminal: once true, never auto-cleared
    #[sea_orm(default_value = false)]
    pub is_banned: bool,

    // === Reporter trust ===
    #[sea_orm(default_value = 0)]
    pub reports_submitted: i32,

    #[sea_orm(default_value = 0)]
    pub reports_confirmed: i32,

    #[sea_orm(default_value = 0)]
    pub reports_rejected: i32,

    /// confirmed / max(1, submitted), clamped to [0, 1]
    #[sea_orm(default_value = 0.0)]
    pub report_accuracy: f64,

    /// Reporting cooldown expiry
    #[sea_orm(nullable)]
    pub report_cooldown_until: Option<DateTimeWithTimeZone>,

    /// Accuracy decay anchor
    #[sea_orm(nullable)]
    pub last_rejected_at: Option<DateTimeWithTimeZone>,

    /// Scales how slowly accuracy heals after a rejected report
    #[sea_orm(nullable)]
    pub last_rejected_severity: Option<Severity>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::report::Entity")]
    Reports,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
