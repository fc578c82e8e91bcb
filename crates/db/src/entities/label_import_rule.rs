//! Label import rule entity.
//!
//! Per-community policy controlling which external posts (by category,
//! scope, rating) may enter that community's feed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rating filter mode for imported external content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMode {
    #[sea_orm(string_value = "safe_only")]
    SafeOnly,
    #[sea_orm(string_value = "nsfw_only")]
    NsfwOnly,
    #[sea_orm(string_value = "both")]
    Both,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "label_import_rule")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique together with `category_key`
    #[sea_orm(indexed)]
    pub community_id: String,

    pub category_key: String,

    pub import_mode: ImportMode,

    /// Scope eligibility flags; a rule with none enabled imports nothing
    #[sea_orm(default_value = false)]
    pub allow_global: bool,

    #[sea_orm(default_value = false)]
    pub allow_country: bool,

    #[sea_orm(default_value = false)]
    pub allow_local: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether at least one scope is enabled.
    #[must_use]
    pub const fn has_enabled_scope(&self) -> bool {
        self.allow_global || self.allow_country || self.allow_local
    }

    /// Whether the rule admits posts of the given scope.
    #[must_use]
    pub const fn allows_scope(&self, scope: super::post::Scope) -> bool {
        match scope {
            super::post::Scope::Global => self.allow_global,
            super::post::Scope::Country => self.allow_country,
            super::post::Scope::Local => self.allow_local,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::community::Entity",
        from = "Column::CommunityId",
        to = "super::community::Column::Id"
    )]
    Community,
}

impl Related<super::community::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Community.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
