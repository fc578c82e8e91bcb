//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Visibility tier of a post or community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    #[sea_orm(string_value = "global")]
    Global,
    #[sea_orm(string_value = "country")]
    Country,
    #[sea_orm(string_value = "local")]
    Local,
}

/// Content classification gating visibility to minors and SAFE communities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    #[sea_orm(string_value = "safe")]
    Safe,
    #[sea_orm(string_value = "nsfw")]
    Nsfw,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Author user ID
    #[sea_orm(indexed)]
    pub author_id: String,

    /// NULL = external/public post, Some = posted inside a community
    #[sea_orm(nullable, indexed)]
    pub community_id: Option<String>,

    /// Visibility tier
    pub scope: Scope,

    /// Content rating
    pub rating: Rating,

    /// Category keys attached to this post
    #[sea_orm(column_type = "JsonBinary")]
    pub categories: Json,

    /// Set by moderation only; removed posts never surface in feeds
    #[sea_orm(default_value = false)]
    pub is_removed: bool,

    /// Like count (denormalized)
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    /// Author country at posting time (for COUNTRY-scope queries)
    #[sea_orm(nullable)]
    pub country_code: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Category keys as strings, tolerating malformed JSON.
    #[must_use]
    pub fn category_keys(&self) -> Vec<String> {
        serde_json::from_value(self.categories.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::community::Entity",
        from = "Column::CommunityId",
        to = "super::community::Column::Id"
    )]
    Community,

    #[sea_orm(has_many = "super::post_like::Entity")]
    Likes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::community::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Community.def()
    }
}

impl Related<super::post_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
