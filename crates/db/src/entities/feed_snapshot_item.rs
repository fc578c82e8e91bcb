//! Feed snapshot item entity.
//!
//! Write-owned exclusively by the feed materializer. Rows for a given
//! (community, day) are wholly replaced on each run, never patched.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Provenance of a snapshot item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemSource {
    /// Posted inside the community itself
    #[sea_orm(string_value = "internal")]
    Internal,
    /// Imported from the public pool via a label rule
    #[sea_orm(string_value = "external")]
    External,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feed_snapshot_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique together with `post_id` and `feed_date`
    #[sea_orm(indexed)]
    pub community_id: String,

    pub post_id: String,

    pub feed_date: Date,

    /// Dense 1-based rank within the (community, date) snapshot
    pub rank: i32,

    /// Like count at materialization time
    pub score: i32,

    pub source: ItemSource,

    /// Category key that admitted an external item
    #[sea_orm(nullable)]
    pub matched_label: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::community::Entity",
        from = "Column::CommunityId",
        to = "super::community::Column::Id"
    )]
    Community,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id"
    )]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
