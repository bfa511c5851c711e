/**
 * Dashboard Routes
 * Counts and recent activity for the admin landing page
 */
use axum::{extract::State, Json};
use serde::Serialize;

use crate::db::models::{BlogPostWithRelations, DashboardStats, PostFilter};
use crate::error::ApiResult;
use crate::routes::auth::AdminSession;
use crate::state::AppState;

const RECENT_POSTS: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub recent_posts: Vec<BlogPostWithRelations>,
}

/// GET /api/admin/stats
pub async fn stats(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<DashboardResponse>> {
    let stats = state.store.dashboard_stats().await?;
    let recent_posts = state
        .store
        .list_posts(PostFilter {
            limit: Some(RECENT_POSTS),
            ..PostFilter::default()
        })
        .await?;
    Ok(Json(DashboardResponse {
        stats,
        recent_posts,
    }))
}
