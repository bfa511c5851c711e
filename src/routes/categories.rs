/**
 * Category Routes
 * Admin CRUD under /api/admin/categories and the public listing
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{Category, CategoryFields, CategoryWithCount, PostScope};
use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AdminSession;
use crate::routes::{non_empty, resolve_slug, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

const DUPLICATE_SLUG: &str = "Category with this slug already exists";

/// GET /api/admin/categories
pub async fn list(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategoryWithCount>>> {
    Ok(Json(state.store.list_categories(PostScope::All).await?))
}

/// GET /api/categories - counts only published posts
pub async fn list_public(State(state): State<AppState>) -> ApiResult<Json<Vec<CategoryWithCount>>> {
    Ok(Json(state.store.list_categories(PostScope::Published).await?))
}

/// POST /api/admin/categories
pub async fn create(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let name = non_empty(input.name).ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let slug = resolve_slug(input.slug.as_deref(), &name)?;

    if state.store.find_category_by_slug(&slug, None).await?.is_some() {
        return Err(ApiError::bad_request(DUPLICATE_SLUG));
    }

    let category = state
        .store
        .create_category(CategoryFields {
            name,
            slug,
            description: non_empty(input.description),
        })
        .await?;
    tracing::info!(category_id = %category.id, "Created category {}", category.slug);
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/admin/categories/{id}
pub async fn get(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CategoryWithCount>> {
    state
        .store
        .get_category(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category"))
}

/// PUT /api/admin/categories/{id} - omitted fields keep their values
pub async fn update(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Json<Category>> {
    let existing = state
        .store
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?
        .category;

    let name = non_empty(input.name).unwrap_or(existing.name);
    let slug = match input.slug {
        Some(slug) => resolve_slug(Some(&slug), &name)?,
        None => existing.slug,
    };
    if state
        .store
        .find_category_by_slug(&slug, Some(id))
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request(DUPLICATE_SLUG));
    }
    let description = match input.description {
        Some(description) => non_empty(Some(description)),
        None => existing.description,
    };

    state
        .store
        .update_category(
            id,
            CategoryFields {
                name,
                slug,
                description,
            },
        )
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category"))
}

/// DELETE /api/admin/categories/{id}
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    if state.store.get_category(id).await?.is_none() {
        return Err(ApiError::not_found("Category"));
    }
    if state.store.count_posts_in_category(id).await? > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete category with existing posts. Please reassign or delete posts first.",
        ));
    }
    if !state.store.delete_category(id).await? {
        return Err(ApiError::not_found("Category"));
    }
    tracing::info!(category_id = %id, "Deleted category");
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{self, TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_derives_slug_and_lists_with_count() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;

        let (status, body) = test_support::send(
            &state,
            "POST",
            "/api/admin/categories",
            Some(&cookie),
            Some(json!({ "name": "Business Strategy" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["slug"], "business-strategy");

        let (status, body) =
            test_support::send(&state, "GET", "/api/admin/categories", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["postCount"], 0);
        assert_eq!(body[0]["name"], "Business Strategy");
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected_and_store_unchanged() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let payload = json!({ "name": "General", "slug": "general" });

        let (status, _) = test_support::send(
            &state,
            "POST",
            "/api/admin/categories",
            Some(&cookie),
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = test_support::send(
            &state,
            "POST",
            "/api/admin/categories",
            Some(&cookie),
            Some(payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Category with this slug already exists");

        let all = state
            .store
            .list_categories(crate::db::models::PostScope::All)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_slug_of_another_category() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        test_support::seed_category(&state, "general").await;
        let other = test_support::seed_category(&state, "news").await;

        let (status, _) = test_support::send(
            &state,
            "PUT",
            &format!("/api/admin/categories/{}", other.id),
            Some(&cookie),
            Some(json!({ "slug": "general" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Keeping its own slug is fine.
        let (status, body) = test_support::send(
            &state,
            "PUT",
            &format!("/api/admin/categories/{}", other.id),
            Some(&cookie),
            Some(json!({ "slug": "news", "name": "Newsroom" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Newsroom");
    }

    #[tokio::test]
    async fn test_delete_with_posts_is_rejected_until_reassigned() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let category = test_support::seed_category(&state, "general").await;
        let post = test_support::seed_post(&state, "hello", true, Some(category.id), vec![]).await;
        let uri = format!("/api/admin/categories/{}", category.id);

        let (status, _) = test_support::send(&state, "DELETE", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = test_support::send(
            &state,
            "PUT",
            &format!("/api/admin/posts/{}", post.post.id),
            Some(&cookie),
            Some(json!({ "categoryId": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = test_support::send(&state, "DELETE", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_missing_category_is_not_found() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let (status, _) = test_support::send(
            &state,
            "GET",
            &format!("/api/admin/categories/{}", uuid::Uuid::new_v4()),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unauthenticated_create_is_rejected_without_mutation() {
        let TestApp { state, .. } = test_support::test_app();
        let (status, _) = test_support::send(
            &state,
            "POST",
            "/api/admin/categories",
            None,
            Some(json!({ "name": "Sneaky" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let all = state
            .store
            .list_categories(crate::db::models::PostScope::All)
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_public_listing_counts_only_published_posts() {
        let TestApp { state, .. } = test_support::test_app();
        let category = test_support::seed_category(&state, "general").await;
        test_support::seed_post(&state, "live", true, Some(category.id), vec![]).await;
        test_support::seed_post(&state, "draft", false, Some(category.id), vec![]).await;

        let (status, body) = test_support::send(&state, "GET", "/api/categories", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["postCount"], 1);
    }
}
