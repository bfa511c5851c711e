/**
 * Subscriber Routes
 * Admin management of newsletter subscribers
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{NewsletterSubscriber, SubscriberStatus};
use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AdminSession;
use crate::routes::{non_empty, normalize_email, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriberInput {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriberUpdated {
    pub message: String,
    pub subscriber: NewsletterSubscriber,
}

fn parse_status(raw: Option<&str>) -> ApiResult<SubscriberStatus> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::bad_request("Valid status is required"))
}

/// GET /api/admin/subscribers?status=ACTIVE
pub async fn list(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<NewsletterSubscriber>>> {
    let status = match non_empty(query.status) {
        Some(raw) => Some(parse_status(Some(&raw))?),
        None => None,
    };
    Ok(Json(state.store.list_subscribers(status).await?))
}

/// POST /api/admin/subscribers
pub async fn create(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(input): Json<SubscriberInput>,
) -> ApiResult<(StatusCode, Json<NewsletterSubscriber>)> {
    let email = normalize_email(input.email.as_deref())?;
    if state.store.find_subscriber_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Subscriber already exists"));
    }

    let subscriber = state
        .store
        .create_subscriber(&email, non_empty(input.name))
        .await?;
    tracing::info!(subscriber_id = %subscriber.id, "Added subscriber");
    Ok((StatusCode::CREATED, Json(subscriber)))
}

/// PATCH /api/admin/subscribers/{id}
pub async fn update_status(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput>,
) -> ApiResult<Json<SubscriberUpdated>> {
    let status = parse_status(input.status.as_deref())?;
    let subscriber = state
        .store
        .set_subscriber_status(id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscriber"))?;

    Ok(Json(SubscriberUpdated {
        message: "Subscriber updated successfully".to_string(),
        subscriber,
    }))
}

/// DELETE /api/admin/subscribers/{id}
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    if !state.store.delete_subscriber(id).await? {
        return Err(ApiError::not_found("Subscriber"));
    }
    tracing::info!(subscriber_id = %id, "Deleted subscriber");
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{self, TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_rejects_invalid_and_duplicate_emails() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;

        let (status, body) = test_support::send(
            &state,
            "POST",
            "/api/admin/subscribers",
            Some(&cookie),
            Some(json!({ "email": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email address");

        let (status, _) = test_support::send(
            &state,
            "POST",
            "/api/admin/subscribers",
            Some(&cookie),
            Some(json!({ "email": "Reader@Example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = test_support::send(
            &state,
            "POST",
            "/api/admin/subscribers",
            Some(&cookie),
            Some(json!({ "email": "reader@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Subscriber already exists");
    }

    #[tokio::test]
    async fn test_status_update_and_filtered_listing() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let kept = state.store.create_subscriber("a@example.com", None).await.unwrap();
        let left = state.store.create_subscriber("b@example.com", None).await.unwrap();

        let (status, body) = test_support::send(
            &state,
            "PATCH",
            &format!("/api/admin/subscribers/{}", left.id),
            Some(&cookie),
            Some(json!({ "status": "UNSUBSCRIBED" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscriber"]["status"], "UNSUBSCRIBED");

        let (_, body) = test_support::send(
            &state,
            "GET",
            "/api/admin/subscribers?status=ACTIVE",
            Some(&cookie),
            None,
        )
        .await;
        let active = body.as_array().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["id"], kept.id.to_string());

        let (status, _) = test_support::send(
            &state,
            "PATCH",
            &format!("/api/admin/subscribers/{}", kept.id),
            Some(&cookie),
            Some(json!({ "status": "BOUNCED" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_subscriber() {
        let TestApp { state, .. } = test_support::test_app();
        let cookie = test_support::admin_cookie(&state).await;
        let subscriber = state.store.create_subscriber("a@example.com", None).await.unwrap();
        let uri = format!("/api/admin/subscribers/{}", subscriber.id);

        let (status, body) = test_support::send(&state, "DELETE", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let (status, _) = test_support::send(&state, "DELETE", &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
