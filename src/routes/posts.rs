/**
 * Admin Post Routes
 * CRUD for blog posts under /api/admin/posts
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::db::models::{BlogPost, BlogPostWithRelations, PostFields, PostFilter};
use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AdminSession;
use crate::routes::{non_empty, resolve_slug, sanitize_html, SuccessResponse};
use crate::state::AppState;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Body of create and update. On update, omitted fields keep their values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub feature_image: Option<String>,
    pub published: Option<bool>,
    /// `null` or `""` clears the category.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub category_id: Option<Option<String>>,
    pub tag_ids: Option<Vec<String>>,
}

/// `published_at` is stamped when a post becomes published and kept afterwards,
/// including across an unpublish.
pub fn resolve_published_at(
    previous: Option<&BlogPost>,
    published: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match previous {
        Some(prev) if !published => prev.published_at,
        Some(prev) if prev.published => prev.published_at.or(Some(now)),
        _ if published => Some(now),
        _ => None,
    }
}

fn parse_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("{} not found", what)))
}

/// Validate the input against the existing post (if any) and produce the row values.
async fn build_fields(
    state: &AppState,
    existing: Option<&BlogPost>,
    input: PostInput,
) -> ApiResult<(PostFields, Option<Vec<Uuid>>)> {
    let title = non_empty(input.title)
        .or_else(|| existing.map(|p| p.title.clone()))
        .ok_or_else(|| ApiError::bad_request("Title is required"))?;

    let slug = match (input.slug, existing) {
        (Some(slug), _) => resolve_slug(Some(&slug), &title)?,
        (None, Some(prev)) => prev.slug.clone(),
        (None, None) => resolve_slug(None, &title)?,
    };
    if state
        .store
        .find_post_by_slug(&slug, existing.map(|p| p.id))
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("Post with this slug already exists"));
    }

    let content = match input.content {
        Some(content) => sanitize_html(&content),
        None => existing.map(|p| p.content.clone()).unwrap_or_default(),
    };
    let excerpt = match input.excerpt {
        Some(excerpt) => non_empty(Some(excerpt)),
        None => existing.and_then(|p| p.excerpt.clone()),
    };
    let feature_image = match input.feature_image {
        Some(image) => non_empty(Some(image)),
        None => existing.and_then(|p| p.feature_image.clone()),
    };

    let category_id = match input.category_id {
        None => existing.and_then(|p| p.category_id),
        Some(raw) => match non_empty(raw) {
            None => None,
            Some(raw) => {
                let id = parse_id(&raw, "Category")?;
                if state.store.get_category(id).await?.is_none() {
                    return Err(ApiError::bad_request("Category not found"));
                }
                Some(id)
            }
        },
    };

    let tag_ids = match input.tag_ids {
        None => None,
        Some(raw) => {
            let mut ids = Vec::with_capacity(raw.len());
            for value in &raw {
                let id = parse_id(value, "Tag")?;
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            if state.store.find_tags(&ids).await?.len() != ids.len() {
                return Err(ApiError::bad_request("One or more tags do not exist"));
            }
            Some(ids)
        }
    };

    let published = input
        .published
        .unwrap_or_else(|| existing.is_some_and(|p| p.published));
    let published_at = resolve_published_at(existing, published, Utc::now());

    Ok((
        PostFields {
            title,
            slug,
            content,
            excerpt,
            feature_image,
            published,
            published_at,
            category_id,
        },
        tag_ids,
    ))
}

/// GET /api/admin/posts - every post, newest first
pub async fn list(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<BlogPostWithRelations>>> {
    Ok(Json(state.store.list_posts(PostFilter::default()).await?))
}

/// POST /api/admin/posts
pub async fn create(
    admin: AdminSession,
    State(state): State<AppState>,
    Json(input): Json<PostInput>,
) -> ApiResult<(StatusCode, Json<BlogPostWithRelations>)> {
    let (fields, tag_ids) = build_fields(&state, None, input).await?;
    let post = state
        .store
        .create_post(admin.user.id, fields, tag_ids.unwrap_or_default())
        .await?;
    tracing::info!(post_id = %post.post.id, published = post.post.published, "Created post {}", post.post.slug);
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/admin/posts/{id}
pub async fn get(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BlogPostWithRelations>> {
    state
        .store
        .get_post(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Post"))
}

/// PUT /api/admin/posts/{id}
pub async fn update(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PostInput>,
) -> ApiResult<Json<BlogPostWithRelations>> {
    let existing = state
        .store
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?
        .post;

    let (fields, tag_ids) = build_fields(&state, Some(&existing), input).await?;
    let post = state
        .store
        .update_post(id, fields, tag_ids)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;
    tracing::info!(post_id = %id, published = post.post.published, "Updated post");
    Ok(Json(post))
}

/// DELETE /api/admin/posts/{id} - tag associations go with it
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    if !state.store.delete_post(id).await? {
        return Err(ApiError::not_found("Post"));
    }
    tracing::info!(post_id = %id, "Deleted post");
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, TestApp};
    use serde_json::json;

    fn post(published: bool, published_at: Option<DateTime<Utc>>) -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            slug: "t".to_string(),
            content: String::new(),
            excerpt: None,
            feature_image: None,
            published,
            published_at,
            author_id: Uuid::new_v4(),
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_published_at_transitions() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(3);

        assert_eq!(resolve_published_at(None, true, now), Some(now));
        assert_eq!(resolve_published_at(None, false, now), None);
        // Staying published keeps the original date.
        assert_eq!(
            resolve_published_at(Some(&post(true, Some(earlier))), true, now),
            Some(earlier)
        );
        // Draft -> published stamps now.
        assert_eq!(
            resolve_published_at(Some(&post(false, Some(earlier))), true, now),
            Some(now)
        );
        // Unpublishing keeps the historical value.
        assert_eq!(
            resolve_published_at(Some(&post(true, Some(earlier))), false, now),
            Some(earlier)
        );
    }

    #[test]
    fn test_category_id_distinguishes_absent_and_null() {
        let absent: PostInput = serde_json::from_value(json!({})).unwrap();
        assert!(absent.category_id.is_none());
        let null: PostInput = serde_json::from_value(json!({ "categoryId": null })).unwrap();
        assert_eq!(null.category_id, Some(None));
    }

    #[tokio::test]
    async fn test_create_published_post_sets_published_at_and_author() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let tag = test_support::seed_tag(&state, "rust").await;

        let (status, body) = test_support::send(
            &state,
            "POST",
            "/api/admin/posts",
            Some(&cookie),
            Some(json!({
                "title": "Hello World",
                "content": "<p>Hi</p><script>alert(1)</script>",
                "published": true,
                "categoryId": "",
                "tagIds": [tag.id.to_string()],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["slug"], "hello-world");
        assert!(body["publishedAt"].is_string());
        assert!(body["category"].is_null());
        assert_eq!(body["content"], "<p>Hi</p>");
        assert_eq!(body["tags"][0]["slug"], "rust");
        assert_eq!(body["author"]["email"], test_support::ADMIN_EMAIL);
    }

    #[tokio::test]
    async fn test_create_draft_has_no_published_at() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let (status, body) = test_support::send(
            &state,
            "POST",
            "/api/admin/posts",
            Some(&cookie),
            Some(json!({ "title": "Draft", "content": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["published"], false);
        assert!(body["publishedAt"].is_null());
    }

    #[tokio::test]
    async fn test_create_validates_title_and_references() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;

        for payload in [
            json!({ "content": "no title" }),
            json!({ "title": "x", "categoryId": Uuid::new_v4().to_string() }),
            json!({ "title": "x", "tagIds": [Uuid::new_v4().to_string()] }),
            json!({ "title": "x", "tagIds": ["not-a-uuid"] }),
        ] {
            let (status, _) = test_support::send(
                &state,
                "POST",
                "/api/admin/posts",
                Some(&cookie),
                Some(payload),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        assert_eq!(state.store.count_posts(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_post_slug_is_rejected() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        test_support::seed_post(&state, "hello", false, None, vec![]).await;

        let (status, _) = test_support::send(
            &state,
            "POST",
            "/api/admin/posts",
            Some(&cookie),
            Some(json!({ "title": "Hello", "slug": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_publishing_a_draft_stamps_published_at() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let draft = test_support::seed_post(&state, "draft", false, None, vec![]).await;
        let uri = format!("/api/admin/posts/{}", draft.post.id);

        let (status, body) = test_support::send(
            &state,
            "PUT",
            &uri,
            Some(&cookie),
            Some(json!({ "published": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["published"], true);
        assert_eq!(body["title"], "draft");
        let first = body["publishedAt"].as_str().unwrap().to_string();

        // An edit that leaves it published keeps the date.
        let (_, body) = test_support::send(
            &state,
            "PUT",
            &uri,
            Some(&cookie),
            Some(json!({ "title": "Renamed" })),
        )
        .await;
        assert_eq!(body["publishedAt"], first);
        assert_eq!(body["title"], "Renamed");
    }

    #[tokio::test]
    async fn test_update_replaces_tags_only_when_given() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let rust = test_support::seed_tag(&state, "rust").await;
        let web = test_support::seed_tag(&state, "web").await;
        let post = test_support::seed_post(&state, "p", false, None, vec![rust.id]).await;
        let uri = format!("/api/admin/posts/{}", post.post.id);

        let (_, body) = test_support::send(
            &state,
            "PUT",
            &uri,
            Some(&cookie),
            Some(json!({ "excerpt": "short" })),
        )
        .await;
        assert_eq!(body["tags"].as_array().unwrap().len(), 1);
        assert_eq!(body["excerpt"], "short");

        let (_, body) = test_support::send(
            &state,
            "PUT",
            &uri,
            Some(&cookie),
            Some(json!({ "tagIds": [web.id.to_string()] })),
        )
        .await;
        assert_eq!(body["tags"][0]["slug"], "web");
        assert_eq!(body["tags"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_post_and_missing_post() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let tag = test_support::seed_tag(&state, "rust").await;
        let post = test_support::seed_post(&state, "p", true, None, vec![tag.id]).await;
        let uri = format!("/api/admin/posts/{}", post.post.id);

        let (status, _) = test_support::send(&state, "DELETE", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.store.count_posts_with_tag(tag.id).await.unwrap(), 0);

        let (status, _) = test_support::send(&state, "DELETE", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = test_support::send(&state, "GET", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unauthenticated_delete_leaves_post() {
        let TestApp { state, .. } = test_support::test_app();
        let post = test_support::seed_post(&state, "p", true, None, vec![]).await;
        let (status, _) = test_support::send(
            &state,
            "DELETE",
            &format!("/api/admin/posts/{}", post.post.id),
            Some("session_token=forged"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(state.store.count_posts(None).await.unwrap(), 1);
    }
}
