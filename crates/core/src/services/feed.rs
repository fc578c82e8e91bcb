//! Feed materialization service.
//!
//! Computes a community's ranked daily snapshot by merging
//! community-internal posts with label-filtered external posts, then
//! publishes it as a whole-snapshot replace.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use plaza_common::{AppResult, IdGenerator};
use plaza_db::entities::feed_snapshot_item::{self, ItemSource};
use plaza_db::entities::label_import_rule::ImportMode;
use plaza_db::entities::post::{self, Rating, Scope};
use plaza_db::repositories::{CommunityRepository, FeedRepository, PostRepository};
use sea_orm::Set;
use tokio::sync::Mutex;

/// Cap on community-internal posts per snapshot.
const INTERNAL_CAP: u64 = 200;

/// Cap on external posts admitted per label rule.
const EXTERNAL_CAP_PER_RULE: u64 = 50;

/// A snapshot candidate before ranking.
struct Candidate {
    post: post::Model,
    source: ItemSource,
    matched_label: Option<String>,
}

/// Rating filter applied to an external import query.
///
/// A SAFE community caps every import at SAFE regardless of the rule's
/// mode; an NSFW post must never enter a SAFE snapshot. Elsewhere the
/// rule's mode decides.
#[must_use]
const fn import_rating_filter(community_rating: Rating, mode: ImportMode) -> Option<Rating> {
    if matches!(community_rating, Rating::Safe) {
        return Some(Rating::Safe);
    }
    match mode {
        ImportMode::SafeOnly => Some(Rating::Safe),
        ImportMode::NsfwOnly => Some(Rating::Nsfw),
        ImportMode::Both => None,
    }
}

/// Dedupe and rank candidates.
///
/// Dedupe keeps the first occurrence per post; internal candidates are
/// pushed before external ones, so an internal post is never shadowed
/// by a duplicate external entry. Ordering is score descending, then
/// recency descending; exact ties on both keep query order.
fn order_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.post.id.clone()));

    candidates.sort_by(|a, b| {
        b.post
            .like_count
            .cmp(&a.post.like_count)
            .then_with(|| b.post.created_at.cmp(&a.post.created_at))
    });

    candidates
}

/// Result of a scheduled sweep over all communities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Communities rebuilt successfully.
    pub succeeded: u64,
    /// Communities whose rebuild failed and was skipped.
    pub failed: u64,
}

/// Service materializing ranked feed snapshots.
#[derive(Clone)]
pub struct FeedService {
    community_repo: CommunityRepository,
    post_repo: PostRepository,
    feed_repo: FeedRepository,
    id_gen: IdGenerator,
    /// Serializes materialization per community so two concurrent
    /// triggers cannot interleave a snapshot's delete/insert sequence.
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub fn new(
        community_repo: CommunityRepository,
        post_repo: PostRepository,
        feed_repo: FeedRepository,
    ) -> Self {
        Self {
            community_repo,
            post_repo,
            feed_repo,
            id_gen: IdGenerator::new(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Today's feed date (UTC midnight normalization).
    #[must_use]
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Materialize the snapshot for a community and date.
    ///
    /// Idempotent in content for identical inputs. The publish step
    /// replaces all existing rows for (community, date) in one
    /// transaction.
    pub async fn materialize(
        &self,
        community_id: &str,
        feed_date: Option<NaiveDate>,
    ) -> AppResult<()> {
        let feed_date = feed_date.unwrap_or_else(Self::today);

        let key_lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(community_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = key_lock.lock().await;

        let community = self.community_repo.get_by_id(community_id).await?;

        let mut candidates: Vec<Candidate> = Vec::new();

        // Internal set: always included, independent of import rules.
        let internal = self
            .post_repo
            .find_internal(community_id, INTERNAL_CAP)
            .await?;
        for post in internal {
            candidates.push(Candidate {
                post,
                source: ItemSource::Internal,
                matched_label: None,
            });
        }

        // External set: one query per label rule with an enabled scope.
        let rules = self.community_repo.find_rules(community_id).await?;
        for rule in rules {
            if !rule.has_enabled_scope() {
                continue;
            }

            let mut scopes = Vec::new();
            if rule.allow_global {
                scopes.push(Scope::Global);
            }
            if rule.allow_country {
                scopes.push(Scope::Country);
            }
            if rule.allow_local {
                scopes.push(Scope::Local);
            }

            let rating = import_rating_filter(community.rating, rule.import_mode);

            let external = self
                .post_repo
                .find_external(&rule.category_key, &scopes, rating, EXTERNAL_CAP_PER_RULE)
                .await?;
            for post in external {
                candidates.push(Candidate {
                    post,
                    source: ItemSource::External,
                    matched_label: Some(rule.category_key.clone()),
                });
            }
        }

        let candidates = order_candidates(candidates);
        let items = self.snapshot_rows(community_id, feed_date, candidates, Utc::now());

        let item_count = items.len();
        self.feed_repo
            .replace_snapshot(community_id, feed_date, items)
            .await?;

        tracing::debug!(
            community_id,
            %feed_date,
            items = item_count,
            "Materialized feed snapshot"
        );

        Ok(())
    }

    /// Build snapshot rows from ordered candidates.
    ///
    /// Ranks are dense and 1-based; the score is frozen from the like
    /// count observed at build time.
    fn snapshot_rows(
        &self,
        community_id: &str,
        feed_date: NaiveDate,
        candidates: Vec<Candidate>,
        now: DateTime<Utc>,
    ) -> Vec<feed_snapshot_item::ActiveModel> {
        candidates
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| feed_snapshot_item::ActiveModel {
                id: Set(self.id_gen.generate()),
                community_id: Set(community_id.to_string()),
                post_id: Set(candidate.post.id),
                feed_date: Set(feed_date),
                rank: Set(index as i32 + 1),
                score: Set(candidate.post.like_count),
                source: Set(candidate.source),
                matched_label: Set(candidate.matched_label),
                created_at: Set(now.into()),
            })
            .collect()
    }

    /// Scheduled sweep: rebuild every community sequentially.
    ///
    /// One community's failure is logged and skipped; it never aborts
    /// sibling runs.
    pub async fn materialize_all(&self, feed_date: Option<NaiveDate>) -> AppResult<SweepOutcome> {
        let feed_date = feed_date.unwrap_or_else(Self::today);
        let community_ids = self.community_repo.find_all_ids().await?;

        let mut outcome = SweepOutcome::default();
        for community_id in community_ids {
            match self.materialize(&community_id, Some(feed_date)).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(
                        community_id,
                        %feed_date,
                        error = %e,
                        "Feed materialization failed; continuing sweep"
                    );
                }
            }
        }

        tracing::info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            %feed_date,
            "Feed sweep completed"
        );

        Ok(outcome)
    }

    /// Page through a snapshot, rank strictly greater than the cursor.
    pub async fn get_feed(
        &self,
        community_id: &str,
        feed_date: NaiveDate,
        cursor_rank: Option<i32>,
        limit: u64,
    ) -> AppResult<Vec<feed_snapshot_item::Model>> {
        self.feed_repo
            .find_page(community_id, feed_date, cursor_rank, limit.min(100))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use plaza_db::entities::{community, label_import_rule};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    fn test_community(id: &str, rating: Rating) -> community::Model {
        community::Model {
            id: id.to_string(),
            name: format!("community-{id}"),
            description: None,
            scope: Scope::Global,
            rating,
            country_code: None,
            categories: json!(["climate"]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_rule(community_id: &str, category: &str, mode: ImportMode) -> label_import_rule::Model {
        label_import_rule::Model {
            id: format!("rule-{category}"),
            community_id: community_id.to_string(),
            category_key: category.to_string(),
            import_mode: mode,
            allow_global: true,
            allow_country: true,
            allow_local: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_post(id: &str, community_id: Option<&str>, likes: i32, age_hours: i64) -> post::Model {
        let created = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap() - Duration::hours(age_hours);
        post::Model {
            id: id.to_string(),
            author_id: "author1".to_string(),
            community_id: community_id.map(ToString::to_string),
            scope: Scope::Global,
            rating: Rating::Safe,
            categories: json!(["climate"]),
            is_removed: false,
            like_count: likes,
            country_code: None,
            created_at: created.into(),
            updated_at: None,
        }
    }

    /// A SAFE community's imports are capped at SAFE whatever the rule
    /// says; only non-SAFE communities honor the rule's mode.
    #[test]
    fn test_import_rating_filter_safe_community_ceiling() {
        assert_eq!(
            import_rating_filter(Rating::Safe, ImportMode::SafeOnly),
            Some(Rating::Safe)
        );
        assert_eq!(
            import_rating_filter(Rating::Safe, ImportMode::NsfwOnly),
            Some(Rating::Safe)
        );
        assert_eq!(
            import_rating_filter(Rating::Safe, ImportMode::Both),
            Some(Rating::Safe)
        );

        assert_eq!(
            import_rating_filter(Rating::Nsfw, ImportMode::SafeOnly),
            Some(Rating::Safe)
        );
        assert_eq!(
            import_rating_filter(Rating::Nsfw, ImportMode::NsfwOnly),
            Some(Rating::Nsfw)
        );
        assert_eq!(import_rating_filter(Rating::Nsfw, ImportMode::Both), None);
    }

    /// Published rows carry dense 1-based ranks and freeze the like
    /// count as the score.
    #[test]
    fn test_snapshot_rows_dense_ranks_and_scores() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = FeedService::new(
            CommunityRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            FeedRepository::new(db),
        );

        let candidates = order_candidates(vec![
            Candidate {
                post: test_post("post-int", Some("comm1"), 2, 1),
                source: ItemSource::Internal,
                matched_label: None,
            },
            Candidate {
                post: test_post("post-ext", None, 5, 2),
                source: ItemSource::External,
                matched_label: Some("climate".to_string()),
            },
        ]);

        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let rows = service.snapshot_rows("comm1", date, candidates, Utc::now());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].post_id.clone().unwrap(), "post-ext");
        assert_eq!(rows[0].rank.clone().unwrap(), 1);
        assert_eq!(rows[0].score.clone().unwrap(), 5);
        assert_eq!(rows[0].source.clone().unwrap(), ItemSource::External);
        assert_eq!(
            rows[0].matched_label.clone().unwrap(),
            Some("climate".to_string())
        );
        assert_eq!(rows[1].post_id.clone().unwrap(), "post-int");
        assert_eq!(rows[1].rank.clone().unwrap(), 2);
        assert_eq!(rows[1].score.clone().unwrap(), 2);
        assert_eq!(rows[1].source.clone().unwrap(), ItemSource::Internal);
    }

    #[test]
    fn test_order_candidates_by_score_then_recency() {
        let candidates = vec![
            Candidate {
                post: test_post("low", Some("comm1"), 1, 1),
                source: ItemSource::Internal,
                matched_label: None,
            },
            Candidate {
                post: test_post("old-high", None, 5, 10),
                source: ItemSource::External,
                matched_label: Some("climate".to_string()),
            },
            Candidate {
                post: test_post("new-high", None, 5, 2),
                source: ItemSource::External,
                matched_label: Some("climate".to_string()),
            },
        ];

        let ordered = order_candidates(candidates);
        let ids: Vec<&str> = ordered.iter().map(|c| c.post.id.as_str()).collect();
        assert_eq!(ids, ["new-high", "old-high", "low"]);
    }

    #[test]
    fn test_order_candidates_first_occurrence_wins() {
        let internal = Candidate {
            post: test_post("shared", Some("comm1"), 3, 1),
            source: ItemSource::Internal,
            matched_label: None,
        };
        let mut shadow_post = test_post("shared", None, 3, 1);
        shadow_post.community_id = None;
        let external = Candidate {
            post: shadow_post,
            source: ItemSource::External,
            matched_label: Some("climate".to_string()),
        };

        let ordered = order_candidates(vec![internal, external]);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].source, ItemSource::Internal);
    }

    /// SAFE community importing "climate" merges its internal post with
    /// the external pool and publishes a snapshot.
    #[tokio::test]
    async fn test_materialize_merges_internal_and_external() {
        let community = test_community("comm1", Rating::Safe);
        let internal = test_post("post-int", Some("comm1"), 2, 1);
        let external = test_post("post-ext", None, 5, 2);
        let rule = test_rule("comm1", "climate", ImportMode::SafeOnly);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[community]])
                .append_query_results([[internal]])
                .append_query_results([[rule]])
                .append_query_results([[external]])
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                ])
                .into_connection(),
        );

        let service = FeedService::new(
            CommunityRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            FeedRepository::new(Arc::clone(&db)),
        );

        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        service.materialize("comm1", Some(date)).await.unwrap();
    }

    /// An internal post duplicated by an external query keeps its
    /// internal provenance (first occurrence wins).
    #[tokio::test]
    async fn test_materialize_dedupes_internal_first() {
        let community = test_community("comm1", Rating::Safe);
        let shared = test_post("post-shared", Some("comm1"), 3, 1);
        let mut shadow = shared.clone();
        shadow.community_id = None;
        let rule = test_rule("comm1", "climate", ImportMode::SafeOnly);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[community]])
                .append_query_results([[shared]])
                .append_query_results([[rule]])
                .append_query_results([[shadow]])
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let service = FeedService::new(
            CommunityRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            FeedRepository::new(Arc::clone(&db)),
        );

        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        service.materialize("comm1", Some(date)).await.unwrap();
    }

    /// A failing community does not abort the sweep.
    #[tokio::test]
    async fn test_sweep_isolates_failures() {
        let good = test_community("comm2", Rating::Safe);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // find_all_ids
                .append_query_results([
                    [maplit_ids("comm1"), maplit_ids("comm2")],
                ])
                // comm1: community lookup comes back empty, so the
                // rebuild fails with NotFound
                .append_query_results([Vec::<community::Model>::new()])
                // comm2: full successful run with no posts or rules
                .append_query_results([[good]])
                .append_query_results([Vec::<post::Model>::new()])
                .append_query_results([Vec::<label_import_rule::Model>::new()])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let service = FeedService::new(
            CommunityRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            FeedRepository::new(Arc::clone(&db)),
        );

        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let outcome = service.materialize_all(Some(date)).await.unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 1);
    }

    fn maplit_ids(id: &str) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        let mut row = std::collections::BTreeMap::new();
        row.insert("id", sea_orm::Value::from(id.to_string()));
        row
    }
}
