/**
 * Tag Routes
 * Admin CRUD under /api/admin/tags and the public listing
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{PostScope, Tag, TagFields, TagWithCount};
use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AdminSession;
use crate::routes::{non_empty, resolve_slug, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInput {
    pub name: Option<String>,
    pub slug: Option<String>,
}

const DUPLICATE_SLUG: &str = "Tag with this slug already exists";

/// GET /api/admin/tags
pub async fn list(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TagWithCount>>> {
    Ok(Json(state.store.list_tags(PostScope::All).await?))
}

/// GET /api/tags
pub async fn list_public(State(state): State<AppState>) -> ApiResult<Json<Vec<TagWithCount>>> {
    Ok(Json(state.store.list_tags(PostScope::Published).await?))
}

/// POST /api/admin/tags
pub async fn create(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(input): Json<TagInput>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let name = non_empty(input.name).ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let slug = resolve_slug(input.slug.as_deref(), &name)?;

    if state.store.find_tag_by_slug(&slug, None).await?.is_some() {
        return Err(ApiError::bad_request(DUPLICATE_SLUG));
    }

    let tag = state.store.create_tag(TagFields { name, slug }).await?;
    tracing::info!(tag_id = %tag.id, "Created tag {}", tag.slug);
    Ok((StatusCode::CREATED, Json(tag)))
}

/// GET /api/admin/tags/{id}
pub async fn get(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TagWithCount>> {
    state
        .store
        .get_tag(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Tag"))
}

/// PUT /api/admin/tags/{id}
pub async fn update(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TagInput>,
) -> ApiResult<Json<Tag>> {
    let existing = state
        .store
        .get_tag(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag"))?
        .tag;

    let name = non_empty(input.name).unwrap_or(existing.name);
    let slug = match input.slug {
        Some(slug) => resolve_slug(Some(&slug), &name)?,
        None => existing.slug,
    };
    if state.store.find_tag_by_slug(&slug, Some(id)).await?.is_some() {
        return Err(ApiError::bad_request(DUPLICATE_SLUG));
    }

    state
        .store
        .update_tag(id, TagFields { name, slug })
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Tag"))
}

/// DELETE /api/admin/tags/{id}
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    if state.store.get_tag(id).await?.is_none() {
        return Err(ApiError::not_found("Tag"));
    }
    if state.store.count_posts_with_tag(id).await? > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete tag that is used by posts. Remove it from those posts first.",
        ));
    }
    if !state.store.delete_tag(id).await? {
        return Err(ApiError::not_found("Tag"));
    }
    tracing::info!(tag_id = %id, "Deleted tag");
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{self, TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_duplicate_tag_slug_is_rejected() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        test_support::seed_tag(&state, "rust").await;

        let (status, body) = test_support::send(
            &state,
            "POST",
            "/api/admin/tags",
            Some(&cookie),
            Some(json!({ "name": "Rust" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tag with this slug already exists");
        assert_eq!(
            state
                .store
                .list_tags(crate::db::models::PostScope::All)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_tag_in_use_cannot_be_deleted_until_detached() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let tag = test_support::seed_tag(&state, "rust").await;
        let post = test_support::seed_post(&state, "hello", true, None, vec![tag.id]).await;
        let uri = format!("/api/admin/tags/{}", tag.id);

        let (status, _) = test_support::send(&state, "DELETE", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = test_support::send(
            &state,
            "PUT",
            &format!("/api/admin/posts/{}", post.post.id),
            Some(&cookie),
            Some(json!({ "tagIds": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = test_support::send(&state, "DELETE", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_explicit_slug_is_rejected() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let (status, _) = test_support::send(
            &state,
            "POST",
            "/api/admin/tags",
            Some(&cookie),
            Some(json!({ "name": "Rust", "slug": "Not A Slug" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_public_tags_need_no_session() {
        let TestApp { state, .. } = test_support::test_app();
        test_support::seed_tag(&state, "rust").await;
        let (status, body) = test_support::send(&state, "GET", "/api/tags", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["slug"], "rust");
        assert_eq!(body[0]["postCount"], 0);
    }
}
