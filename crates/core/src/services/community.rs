//! Community label-rule administration.
//!
//! Label import rules decide which external posts a community's feed
//! pulls in; editing them invalidates the community's snapshot.

use chrono::Utc;
use plaza_common::{AppError, AppResult, IdGenerator};
use plaza_db::entities::community_member::MemberRole;
use plaza_db::entities::label_import_rule::{self, ImportMode};
use plaza_db::entities::user;
use plaza_db::repositories::{CommunityRepository, UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::trigger::RankTrigger;

/// Input for creating or updating a label import rule.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRuleInput {
    /// Acting user.
    pub actor_id: String,
    /// Target community.
    pub community_id: String,
    /// Category key the rule imports.
    #[validate(length(min = 1, max = 64))]
    pub category_key: String,
    /// Rating filter mode.
    pub import_mode: ImportMode,
    /// Import from the global pool.
    pub allow_global: bool,
    /// Import from the community's country pool.
    pub allow_country: bool,
    /// Import from the local pool.
    pub allow_local: bool,
}

/// Service for community feed administration.
#[derive(Clone)]
pub struct CommunityService {
    community_repo: CommunityRepository,
    user_repo: UserRepository,
    trigger: RankTrigger,
    id_gen: IdGenerator,
}

impl CommunityService {
    /// Create a new community service.
    #[must_use]
    pub fn new(
        community_repo: CommunityRepository,
        user_repo: UserRepository,
        trigger: RankTrigger,
    ) -> Self {
        Self {
            community_repo,
            user_repo,
            trigger,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create or update the rule for (community, category).
    pub async fn upsert_rule(
        &self,
        input: UpsertRuleInput,
    ) -> AppResult<label_import_rule::Model> {
        input.validate()?;

        let actor = self.user_repo.get_by_id(&input.actor_id).await?;
        let community = self.community_repo.get_by_id(&input.community_id).await?;
        self.authorize_admin(&actor, &community.id).await?;

        // A rule may only import categories the community declares.
        if !community
            .category_keys()
            .iter()
            .any(|key| key == &input.category_key)
        {
            return Err(AppError::BadRequest(format!(
                "category {} is not declared by the community",
                input.category_key
            )));
        }

        let now = Utc::now();
        let existing = self
            .community_repo
            .find_rule(&input.community_id, &input.category_key)
            .await?;

        let saved = if let Some(existing) = existing {
            let mut active: label_import_rule::ActiveModel = existing.into();
            active.import_mode = Set(input.import_mode);
            active.allow_global = Set(input.allow_global);
            active.allow_country = Set(input.allow_country);
            active.allow_local = Set(input.allow_local);
            active.updated_at = Set(Some(now.into()));
            self.community_repo.update_rule(active).await?
        } else {
            self.community_repo
                .create_rule(label_import_rule::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    community_id: Set(input.community_id.clone()),
                    category_key: Set(input.category_key.clone()),
                    import_mode: Set(input.import_mode),
                    allow_global: Set(input.allow_global),
                    allow_country: Set(input.allow_country),
                    allow_local: Set(input.allow_local),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                })
                .await?
        };

        self.trigger.community_changed(&input.community_id).await;
        Ok(saved)
    }

    /// Delete the rule for (community, category).
    pub async fn delete_rule(
        &self,
        actor_id: &str,
        community_id: &str,
        category_key: &str,
    ) -> AppResult<()> {
        let actor = self.user_repo.get_by_id(actor_id).await?;
        self.community_repo.get_by_id(community_id).await?;
        self.authorize_admin(&actor, community_id).await?;

        let rule = self
            .community_repo
            .find_rule(community_id, category_key)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("no rule for category {category_key}"))
            })?;

        self.community_repo.delete_rule(&rule.id).await?;
        self.trigger.community_changed(community_id).await;
        Ok(())
    }

    /// Rule edits require community admin or platform admin.
    async fn authorize_admin(&self, actor: &user::Model, community_id: &str) -> AppResult<()> {
        if actor.is_admin {
            return Ok(());
        }

        let member = self
            .community_repo
            .find_member(community_id, &actor.id)
            .await?;
        if member.is_some_and(|m| m.role == MemberRole::Admin) {
            return Ok(());
        }

        Err(AppError::Forbidden(
            "label rules require community admin privileges".to_string(),
        ))
    }
}
