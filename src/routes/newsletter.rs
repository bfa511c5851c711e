/**
 * Newsletter Routes
 * Public subscribe and unsubscribe endpoints
 */
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{NewsletterSubscriber, SubscriberStatus};
use crate::error::{ApiError, ApiResult};
use crate::routes::{non_empty, normalize_email, MessageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriberSummary {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: String,
    pub subscriber: SubscriberSummary,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    pub email: Option<String>,
}

/// Existing active subscribers are returned as-is and unsubscribed ones are
/// reactivated, so repeated sign-ups never duplicate a row.
async fn upsert_subscriber(
    state: &AppState,
    email: &str,
    name: Option<String>,
) -> ApiResult<NewsletterSubscriber> {
    match state.store.find_subscriber_by_email(email).await? {
        Some(existing) if existing.status == SubscriberStatus::Active => Ok(existing),
        Some(existing) => state
            .store
            .set_subscriber_status(existing.id, SubscriberStatus::Active)
            .await?
            .ok_or_else(|| ApiError::not_found("Subscriber")),
        None => Ok(state.store.create_subscriber(email, name).await?),
    }
}

/// POST /api/newsletter/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribeRequest>,
) -> ApiResult<Json<SubscribeResponse>> {
    let email = normalize_email(payload.email.as_deref())?;
    let name = non_empty(payload.name);

    let subscriber = upsert_subscriber(&state, &email, name.clone()).await?;
    tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscription");

    if let Err(e) = state.email.send_welcome_email(&email, name.as_deref()).await {
        tracing::warn!(error = %e, "Failed to send welcome email");
    }

    Ok(Json(SubscribeResponse {
        message: "Successfully subscribed to newsletter".to_string(),
        subscriber: SubscriberSummary {
            id: subscriber.id,
            email: subscriber.email,
            name: subscriber.name,
        },
    }))
}

/// GET|POST /api/newsletter/unsubscribe?email=
pub async fn unsubscribe(
    State(state): State<AppState>,
    Query(query): Query<UnsubscribeQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let email = normalize_email(query.email.as_deref())?;
    let subscriber = state
        .store
        .find_subscriber_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscriber"))?;

    if subscriber.status != SubscriberStatus::Unsubscribed {
        state
            .store
            .set_subscriber_status(subscriber.id, SubscriberStatus::Unsubscribed)
            .await?;
        tracing::info!(subscriber_id = %subscriber.id, "Unsubscribed");
    }

    Ok(Json(MessageResponse {
        message: "Successfully unsubscribed from newsletter".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::db::models::SubscriberStatus;
    use crate::test_support::{self, TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscribe_twice_returns_same_subscriber() {
        let TestApp { state, mailer, .. } = test_support::test_app();
        let payload = json!({ "email": "Reader@Example.com", "name": "Ada" });

        let (status, first) = test_support::send(
            &state,
            "POST",
            "/api/newsletter/subscribe",
            None,
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["message"], "Successfully subscribed to newsletter");
        assert_eq!(first["subscriber"]["email"], "reader@example.com");

        let (status, second) =
            test_support::send(&state, "POST", "/api/newsletter/subscribe", None, Some(payload))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["subscriber"]["id"], second["subscriber"]["id"]);
        assert_eq!(state.store.list_subscribers(None).await.unwrap().len(), 1);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].html.contains("Ada"));
    }

    #[tokio::test]
    async fn test_subscribe_requires_valid_email() {
        let TestApp { state, .. } = test_support::test_app();
        for payload in [json!({}), json!({ "email": "nope" })] {
            let (status, _) = test_support::send(
                &state,
                "POST",
                "/api/newsletter/subscribe",
                None,
                Some(payload),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_welcome_email_failure_does_not_fail_subscription() {
        let state = test_support::test_app_with_failing_mailer().state;
        let (status, body) = test_support::send(
            &state,
            "POST",
            "/api/newsletter/subscribe",
            None,
            Some(json!({ "email": "reader@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["subscriber"]["name"].is_null());
    }

    #[tokio::test]
    async fn test_unsubscribe_then_resubscribe_reactivates() {
        let TestApp { state, .. } = test_support::test_app();
        let subscriber = state
            .store
            .create_subscriber("reader@example.com", None)
            .await
            .unwrap();

        let (status, _) = test_support::send(
            &state,
            "GET",
            "/api/newsletter/unsubscribe?email=reader%40example.com",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let stored = state.store.get_subscriber(subscriber.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriberStatus::Unsubscribed);

        let (_, body) = test_support::send(
            &state,
            "POST",
            "/api/newsletter/subscribe",
            None,
            Some(json!({ "email": "reader@example.com" })),
        )
        .await;
        assert_eq!(body["subscriber"]["id"], subscriber.id.to_string());
        let stored = state.store.get_subscriber(subscriber.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriberStatus::Active);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_email_is_not_found() {
        let TestApp { state, .. } = test_support::test_app();
        let (status, _) = test_support::send(
            &state,
            "POST",
            "/api/newsletter/unsubscribe?email=ghost@example.com",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
