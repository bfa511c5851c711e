/**
 * Blog Routes
 * Public read-only endpoints for published posts
 */
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::{BlogPostWithRelations, PostFilter};
use crate::error::{ApiError, ApiResult};
use crate::routes::non_empty;
use crate::routes::seo::{article_json_ld, breadcrumb_json_ld, PageMetadata};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/blog
#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl BlogListQuery {
    fn into_filter(self) -> PostFilter {
        PostFilter {
            category_slug: non_empty(self.category),
            tag_slug: non_empty(self.tag),
            limit: self.limit.map(|l| l.clamp(1, MAX_PAGE_SIZE)),
            skip: self.skip.unwrap_or(0).max(0),
            ..PostFilter::published()
        }
    }
}

/// Response for GET /api/blog/{slug}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostResponse {
    #[serde(flatten)]
    pub post: BlogPostWithRelations,
    pub metadata: PageMetadata,
    pub structured_data: Vec<Value>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blog?category=&tag=&limit=&skip= - published posts, newest first
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogListQuery>,
) -> ApiResult<Json<Vec<BlogPostWithRelations>>> {
    Ok(Json(state.store.list_posts(query.into_filter()).await?))
}

/// GET /api/blog/featured - the most recently published post
pub async fn featured_post(
    State(state): State<AppState>,
) -> ApiResult<Json<BlogPostWithRelations>> {
    state
        .store
        .list_posts(PostFilter {
            limit: Some(1),
            ..PostFilter::published()
        })
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Post"))
}

/// GET /api/blog/{slug} - drafts are not visible here
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<BlogPostResponse>> {
    let post = state
        .store
        .get_post_by_slug(&slug)
        .await?
        .filter(|p| p.post.published)
        .ok_or_else(|| ApiError::not_found("Post"))?;

    let site = &state.config.site;
    let post_path = format!("/blog/{}", post.post.slug);
    let structured_data = vec![
        article_json_ld(site, &post),
        breadcrumb_json_ld(
            site,
            &[
                ("Home", "/"),
                ("Blog", "/blog"),
                (post.post.title.as_str(), post_path.as_str()),
            ],
        ),
    ];

    Ok(Json(BlogPostResponse {
        metadata: PageMetadata::for_post(site, &post),
        structured_data,
        post,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PostFields;
    use crate::test_support::{self, TestApp};
    use axum::http::StatusCode;

    #[test]
    fn test_list_query_clamps_paging() {
        let filter = BlogListQuery {
            limit: Some(1000),
            skip: Some(-5),
            category: Some(" ".to_string()),
            ..Default::default()
        }
        .into_filter();
        assert!(filter.published_only);
        assert_eq!(filter.limit, Some(MAX_PAGE_SIZE));
        assert_eq!(filter.skip, 0);
        assert_eq!(filter.category_slug, None);
    }

    #[tokio::test]
    async fn test_list_hides_drafts_and_filters_by_taxonomy() {
        let TestApp { state, .. } = test_support::test_app();
        let news = test_support::seed_category(&state, "news").await;
        let rust = test_support::seed_tag(&state, "rust").await;
        test_support::seed_post(&state, "in-news", true, Some(news.id), vec![]).await;
        test_support::seed_post(&state, "tagged", true, None, vec![rust.id]).await;
        test_support::seed_post(&state, "draft", false, Some(news.id), vec![rust.id]).await;

        let (status, body) = test_support::send(&state, "GET", "/api/blog", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) =
            test_support::send(&state, "GET", "/api/blog?category=news", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["slug"], "in-news");

        let (_, body) = test_support::send(&state, "GET", "/api/blog?tag=rust", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["slug"], "tagged");

        let (_, body) =
            test_support::send(&state, "GET", "/api/blog?limit=1&skip=1", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_post_includes_structured_data() {
        let TestApp { state, .. } = test_support::test_app();
        test_support::seed_post(&state, "hello-world", true, None, vec![]).await;

        let (status, body) =
            test_support::send(&state, "GET", "/api/blog/hello-world", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slug"], "hello-world");
        assert_eq!(body["structuredData"][0]["@type"], "Article");
        assert_eq!(body["structuredData"][1]["@type"], "BreadcrumbList");
        assert_eq!(body["metadata"]["kind"], "article");
        assert!(body["metadata"]["canonical"]
            .as_str()
            .unwrap()
            .ends_with("/blog/hello-world"));
    }

    #[tokio::test]
    async fn test_draft_and_missing_posts_are_not_found() {
        let TestApp { state, .. } = test_support::test_app();
        test_support::seed_post(&state, "draft", false, None, vec![]).await;

        let (status, _) = test_support::send(&state, "GET", "/api/blog/draft", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = test_support::send(&state, "GET", "/api/blog/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            test_support::send(&state, "GET", "/api/blog/featured", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn set_published_at(
        state: &AppState,
        post: &BlogPostWithRelations,
        at: chrono::DateTime<chrono::Utc>,
    ) {
        let p = &post.post;
        state
            .store
            .update_post(
                p.id,
                PostFields {
                    title: p.title.clone(),
                    slug: p.slug.clone(),
                    content: p.content.clone(),
                    excerpt: p.excerpt.clone(),
                    feature_image: p.feature_image.clone(),
                    published: p.published,
                    published_at: Some(at),
                    category_id: p.category_id,
                },
                None,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_featured_is_latest_published() {
        let TestApp { state, .. } = test_support::test_app();
        // Created first but published later, so creation order cannot decide.
        let newer = test_support::seed_post(&state, "newer", true, None, vec![]).await;
        let older = test_support::seed_post(&state, "older", true, None, vec![]).await;
        test_support::seed_post(&state, "draft", false, None, vec![]).await;
        let now = chrono::Utc::now();
        set_published_at(&state, &older, now - chrono::Duration::hours(2)).await;
        set_published_at(&state, &newer, now - chrono::Duration::hours(1)).await;

        let (status, body) =
            test_support::send(&state, "GET", "/api/blog/featured", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slug"], "newer");
    }
}
