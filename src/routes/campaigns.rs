/**
 * Campaign Routes
 * Newsletter campaigns: drafting, test sends and the one-shot send to all
 * active subscribers
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{CampaignFields, CampaignStatus, EmailCampaign, SubscriberStatus};
use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AdminSession;
use crate::routes::{non_empty, normalize_email, MessageResponse, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CampaignInput {
    pub subject: Option<String>,
    pub content: Option<String>,
    pub status: Option<CampaignStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSendInput {
    pub test_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CampaignCreated {
    pub message: String,
    pub campaign: EmailCampaign,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSent {
    pub message: String,
    pub recipient_count: usize,
}

async fn load(state: &AppState, id: Uuid) -> ApiResult<EmailCampaign> {
    state
        .store
        .get_campaign(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Campaign"))
}

/// GET /api/admin/newsletter/campaigns
pub async fn list(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EmailCampaign>>> {
    Ok(Json(state.store.list_campaigns().await?))
}

/// POST /api/admin/newsletter/campaigns - always starts as a draft
pub async fn create(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(input): Json<CampaignInput>,
) -> ApiResult<(StatusCode, Json<CampaignCreated>)> {
    let (Some(subject), Some(content)) = (non_empty(input.subject), non_empty(input.content))
    else {
        return Err(ApiError::bad_request("Subject and content are required"));
    };

    let campaign = state.store.create_campaign(&subject, &content).await?;
    tracing::info!(campaign_id = %campaign.id, "Created campaign");
    Ok((
        StatusCode::CREATED,
        Json(CampaignCreated {
            message: "Campaign created successfully".to_string(),
            campaign,
        }),
    ))
}

/// GET /api/admin/newsletter/campaigns/{id}
pub async fn get(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EmailCampaign>> {
    Ok(Json(load(&state, id).await?))
}

/// PUT /api/admin/newsletter/campaigns/{id}
pub async fn update(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CampaignInput>,
) -> ApiResult<Json<EmailCampaign>> {
    let existing = load(&state, id).await?;
    if existing.status == CampaignStatus::Sent {
        return Err(ApiError::bad_request("Sent campaigns cannot be modified"));
    }

    let status = match input.status {
        None => existing.status,
        Some(
            status @ (CampaignStatus::Draft | CampaignStatus::Scheduled | CampaignStatus::Cancelled),
        ) => status,
        Some(_) => {
            return Err(ApiError::bad_request(
                "Status must be DRAFT, SCHEDULED or CANCELLED",
            ))
        }
    };

    let fields = CampaignFields {
        subject: non_empty(input.subject).unwrap_or(existing.subject),
        content: non_empty(input.content).unwrap_or(existing.content),
        status,
    };
    state
        .store
        .update_campaign(id, fields)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Campaign"))
}

/// DELETE /api/admin/newsletter/campaigns/{id}
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    if !state.store.delete_campaign(id).await? {
        return Err(ApiError::not_found("Campaign"));
    }
    tracing::info!(campaign_id = %id, "Deleted campaign");
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/admin/newsletter/campaigns/{id}/send
///
/// The campaign is only marked SENT after the provider accepted the batch, so
/// a failed send can be retried.
pub async fn send(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CampaignSent>> {
    let campaign = load(&state, id).await?;
    if campaign.status == CampaignStatus::Sent {
        return Err(ApiError::bad_request("Campaign already sent"));
    }

    let recipients: Vec<String> = state
        .store
        .list_subscribers(Some(SubscriberStatus::Active))
        .await?
        .into_iter()
        .map(|s| s.email)
        .collect();
    if recipients.is_empty() {
        return Err(ApiError::bad_request("No active subscribers found"));
    }

    let recipient_count = recipients.len();
    let message_ids = state
        .email
        .send_newsletter_campaign(recipients, &campaign.subject, &campaign.content)
        .await?;

    let count = i32::try_from(recipient_count).unwrap_or(i32::MAX);
    state.store.mark_campaign_sent(id, count).await?;
    tracing::info!(
        campaign_id = %id,
        recipient_count,
        messages = message_ids.len(),
        "Campaign sent"
    );

    Ok(Json(CampaignSent {
        message: "Campaign sent successfully".to_string(),
        recipient_count,
    }))
}

/// POST /api/admin/newsletter/campaigns/{id}/test
pub async fn send_test(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TestSendInput>,
) -> ApiResult<Json<MessageResponse>> {
    if non_empty(input.test_email.clone()).is_none() {
        return Err(ApiError::bad_request("Test email is required"));
    }
    let email = normalize_email(input.test_email.as_deref())?;
    let campaign = load(&state, id).await?;

    state
        .email
        .send_test_email(&email, &campaign.subject, &campaign.content)
        .await?;
    tracing::info!(campaign_id = %id, "Test email sent");

    Ok(Json(MessageResponse {
        message: "Test email sent successfully".to_string(),
    }))
}
