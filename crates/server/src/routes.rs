//! HTTP endpoints.
//!
//! Thin handlers over the core services. Request identity arrives as an
//! explicit user id in each body; session handling lives elsewhere on
//! the platform.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use plaza_common::AppResult;
use plaza_core::{
    CommunityService, CreatePostInput, CreateReportInput, FeedService, ModerationService,
    PostService, RankTrigger, ReportService, UpsertRuleInput,
};
use plaza_db::entities::feed_snapshot_item::{self, ItemSource};
use plaza_db::entities::moderation_action::ActionOutcome;
use plaza_db::entities::post;
use plaza_db::entities::report;
use serde::{Deserialize, Serialize};

use crate::response::ApiResponse;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub feed_service: FeedService,
    pub post_service: PostService,
    pub report_service: ReportService,
    pub moderation_service: ModerationService,
    pub community_service: CommunityService,
    pub trigger: RankTrigger,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/healthz", get(healthz))
        .route("/api/feed", get(get_feed))
        .route("/api/feed/materialize", post(materialize))
        .route("/api/posts", post(create_post))
        .route("/api/posts/like", post(toggle_like))
        .route("/api/posts/rerank", post(rerank))
        .route("/api/reports", post(create_report))
        .route("/api/moderation/action", post(moderation_action))
        .route("/api/communities/rules", post(upsert_rule))
        .route("/api/communities/rules/delete", post(delete_rule))
        .with_state(state)
}

// ==================== Request/Response Types ====================

/// Feed page query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub community_id: String,
    pub date: NaiveDate,
    pub cursor_rank: Option<i32>,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_limit() -> u64 {
    30
}

/// Feed item response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemResponse {
    pub post_id: String,
    pub rank: i32,
    pub score: i32,
    pub source: ItemSource,
    pub matched_label: Option<String>,
}

impl From<feed_snapshot_item::Model> for FeedItemResponse {
    fn from(item: feed_snapshot_item::Model) -> Self {
        Self {
            post_id: item.post_id,
            rank: item.rank,
            score: item.score,
            source: item.source,
            matched_label: item.matched_label,
        }
    }
}

/// Materialize request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeRequest {
    pub community_id: String,
    pub date: Option<NaiveDate>,
}

/// Post response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub author_id: String,
    pub community_id: Option<String>,
    pub scope: post::Scope,
    pub rating: post::Rating,
    pub categories: serde_json::Value,
    pub like_count: i32,
    pub created_at: String,
}

impl From<post::Model> for PostResponse {
    fn from(p: post::Model) -> Self {
        Self {
            id: p.id,
            author_id: p.author_id,
            community_id: p.community_id,
            scope: p.scope,
            rating: p.rating,
            categories: p.categories,
            like_count: p.like_count,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// Like toggle request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub user_id: String,
    pub post_id: String,
}

/// Like toggle response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
}

/// Rerank request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankRequest {
    pub post_id: String,
}

/// Report response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub post_id: String,
    pub status: report::ReportStatus,
    pub created_at: String,
}

impl From<report::Model> for ReportResponse {
    fn from(r: report::Model) -> Self {
        Self {
            id: r.id,
            post_id: r.post_id,
            status: r.status,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Moderation decision request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationActionRequest {
    pub post_id: String,
    pub outcome: ActionOutcome,
    pub note: Option<String>,
    pub actor_id: String,
}

/// Moderation decision response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationActionResponse {
    pub success: bool,
}

/// Rule deletion request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRuleRequest {
    pub actor_id: String,
    pub community_id: String,
    pub category_key: String,
}

/// Rule response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    pub id: String,
    pub community_id: String,
    pub category_key: String,
}

// ==================== Handlers ====================

/// Liveness probe.
async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Read a page of a ranked snapshot.
async fn get_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<Vec<FeedItemResponse>>> {
    let items = state
        .feed_service
        .get_feed(&query.community_id, query.date, query.cursor_rank, query.limit)
        .await?;

    Ok(ApiResponse::ok(items.into_iter().map(Into::into).collect()))
}

/// Rebuild a community's snapshot on demand.
async fn materialize(
    State(state): State<AppState>,
    Json(req): Json<MaterializeRequest>,
) -> AppResult<StatusCode> {
    state
        .feed_service
        .materialize(&req.community_id, req.date)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Create a post.
async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.post_service.create_post(input).await?;

    Ok(ApiResponse::ok(post.into()))
}

/// Toggle a like.
async fn toggle_like(
    State(state): State<AppState>,
    Json(req): Json<LikeRequest>,
) -> AppResult<ApiResponse<LikeResponse>> {
    let liked = state
        .post_service
        .toggle_like(&req.user_id, &req.post_id)
        .await?;

    Ok(ApiResponse::ok(LikeResponse { liked }))
}

/// Enqueue rebuilds for every community a post affects.
async fn rerank(
    State(state): State<AppState>,
    Json(req): Json<RerankRequest>,
) -> AppResult<StatusCode> {
    state.trigger.rerank_for_post(&req.post_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// File a report.
async fn create_report(
    State(state): State<AppState>,
    Json(input): Json<CreateReportInput>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let created = state.report_service.create_report(input).await?;

    Ok(ApiResponse::ok(created.into()))
}

/// Apply a moderation decision.
async fn moderation_action(
    State(state): State<AppState>,
    Json(req): Json<ModerationActionRequest>,
) -> AppResult<ApiResponse<ModerationActionResponse>> {
    state
        .moderation_service
        .decide(&req.post_id, req.outcome, req.note, &req.actor_id)
        .await?;

    Ok(ApiResponse::ok(ModerationActionResponse { success: true }))
}

/// Create or update a label import rule.
async fn upsert_rule(
    State(state): State<AppState>,
    Json(input): Json<UpsertRuleInput>,
) -> AppResult<ApiResponse<RuleResponse>> {
    let rule = state.community_service.upsert_rule(input).await?;

    Ok(ApiResponse::ok(RuleResponse {
        id: rule.id,
        community_id: rule.community_id,
        category_key: rule.category_key,
    }))
}

/// Delete a label import rule.
async fn delete_rule(
    State(state): State<AppState>,
    Json(req): Json<DeleteRuleRequest>,
) -> AppResult<StatusCode> {
    state
        .community_service
        .delete_rule(&req.actor_id, &req.community_id, &req.category_key)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
