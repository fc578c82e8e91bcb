//! Community entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::post::{Rating, Scope};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "community")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Visibility tier of the community itself
    pub scope: Scope,

    /// A SAFE community caps every import at SAFE regardless of rules
    pub rating: Rating,

    /// Community country (for COUNTRY-scope communities)
    #[sea_orm(nullable)]
    pub country_code: Option<String>,

    /// Declared category keys
    #[sea_orm(column_type = "JsonBinary")]
    pub categories: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Declared category keys as strings.
    #[must_use]
    pub fn category_keys(&self) -> Vec<String> {
        serde_json::from_value(self.categories.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::community_member::Entity")]
    Members,

    #[sea_orm(has_many = "super::label_import_rule::Entity")]
    ImportRules,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::community_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::label_import_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImportRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
