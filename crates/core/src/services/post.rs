//! Post creation and like toggling.
//!
//! These are the write paths that exercise the trust gates and the
//! re-rank trigger. Full post CRUD lives elsewhere on the platform.

use chrono::Utc;
use plaza_common::{AppError, AppResult, IdGenerator};
use plaza_db::entities::post::{self, Rating, Scope};
use plaza_db::entities::post_like;
use plaza_db::repositories::{CommunityRepository, PostRepository};
use sea_orm::Set;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::trigger::RankTrigger;
use super::trust::{poster_state, TrustService};

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    /// Posting user.
    pub author_id: String,
    /// Home community; absent for public-pool posts.
    pub community_id: Option<String>,
    /// Visibility scope.
    pub scope: Scope,
    /// Content rating.
    pub rating: Rating,
    /// Category keys, at least one.
    #[validate(length(min = 1, max = 8))]
    pub categories: Vec<String>,
    /// Country, required for country-scoped posts.
    pub country_code: Option<String>,
}

/// Service for post writes.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    community_repo: CommunityRepository,
    trust: TrustService,
    trigger: RankTrigger,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        community_repo: CommunityRepository,
        trust: TrustService,
        trigger: RankTrigger,
    ) -> Self {
        Self {
            post_repo,
            community_repo,
            trust,
            trigger,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a post, enforcing the author's posting privileges.
    pub async fn create_post(&self, input: CreatePostInput) -> AppResult<post::Model> {
        input.validate()?;

        if input.scope == Scope::Country && input.country_code.is_none() {
            return Err(AppError::BadRequest(
                "country-scoped posts require a country code".to_string(),
            ));
        }

        let now = Utc::now();

        // Lazy decay first, so a healed cooldown does not block the
        // request it healed on.
        let author = self.trust.refresh(&input.author_id, now).await?;
        let state = poster_state(&author);

        if state.is_banned {
            return Err(AppError::Forbidden("author is banned".to_string()));
        }
        if state.has_active_cooldown(now) {
            return Err(AppError::Forbidden(
                "author is under a posting cooldown".to_string(),
            ));
        }

        if let Some(community_id) = &input.community_id {
            self.community_repo.get_by_id(community_id).await?;
            let member = self
                .community_repo
                .find_member(community_id, &author.id)
                .await?;
            if member.is_none() {
                return Err(AppError::Forbidden(
                    "author is not a member of the community".to_string(),
                ));
            }
        }

        let post = self
            .post_repo
            .create(post::ActiveModel {
                id: Set(self.id_gen.generate()),
                author_id: Set(author.id),
                community_id: Set(input.community_id),
                scope: Set(input.scope),
                rating: Set(input.rating),
                categories: Set(json!(input.categories)),
                is_removed: Set(false),
                like_count: Set(0),
                country_code: Set(input.country_code),
                created_at: Set(now.into()),
                updated_at: Set(None),
            })
            .await?;

        tracing::debug!(post_id = %post.id, "Post created");

        self.trigger.rerank_for_post(&post.id).await?;
        Ok(post)
    }

    /// Toggle a like; returns whether the post is liked afterwards.
    pub async fn toggle_like(&self, user_id: &str, post_id: &str) -> AppResult<bool> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.is_removed {
            return Err(AppError::Conflict("post is removed".to_string()));
        }

        let liked = match self.post_repo.find_like(user_id, post_id).await? {
            Some(existing) => {
                self.post_repo.delete_like(&existing.id).await?;
                self.post_repo.adjust_like_count(post_id, -1).await?;
                false
            }
            None => {
                self.post_repo
                    .create_like(post_like::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        user_id: Set(user_id.to_string()),
                        post_id: Set(post_id.to_string()),
                        created_at: Set(Utc::now().into()),
                    })
                    .await?;
                self.post_repo.adjust_like_count(post_id, 1).await?;
                true
            }
        };

        // Scores moved; affected snapshots rebuild off-request.
        self.trigger.rerank_for_post(post_id).await?;

        Ok(liked)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_post_input_validates_categories() {
        let input = CreatePostInput {
            author_id: "user1".to_string(),
            community_id: None,
            scope: Scope::Global,
            rating: Rating::Safe,
            categories: vec![],
            country_code: None,
        };
        assert!(input.validate().is_err());

        let input = CreatePostInput {
            categories: vec!["climate".to_string()],
            ..input
        };
        assert!(input.validate().is_ok());
    }
}
