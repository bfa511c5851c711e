/**
 * Company Routes
 * Portfolio showcase: admin CRUD plus the public listing
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{Company, CompanyFields, CompanyListing, CompanyStatus};
use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AdminSession;
use crate::routes::{non_empty, resolve_slug, MessageResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub status: Option<CompanyStatus>,
    pub founded: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub image: Option<String>,
    pub featured: Option<bool>,
    pub sort_order: Option<i32>,
}

const DUPLICATE_SLUG: &str = "Company with this slug already exists";

fn keep(given: Option<String>, current: Option<&Option<String>>) -> Option<String> {
    match given {
        Some(value) => non_empty(Some(value)),
        None => current.cloned().flatten(),
    }
}

/// Merge the input over `existing`; blank optional strings are stored as null.
fn merge(
    existing: Option<&Company>,
    input: CompanyInput,
    slug: String,
    name: String,
) -> CompanyFields {
    CompanyFields {
        name,
        slug,
        description: keep(input.description, existing.map(|c| &c.description)),
        industry: keep(input.industry, existing.map(|c| &c.industry)),
        status: input
            .status
            .or(existing.map(|c| c.status))
            .unwrap_or(CompanyStatus::Active),
        founded: keep(input.founded, existing.map(|c| &c.founded)),
        website: keep(input.website, existing.map(|c| &c.website)),
        logo: keep(input.logo, existing.map(|c| &c.logo)),
        image: keep(input.image, existing.map(|c| &c.image)),
        featured: input
            .featured
            .or(existing.map(|c| c.featured))
            .unwrap_or(false),
        sort_order: input
            .sort_order
            .or(existing.map(|c| c.sort_order))
            .unwrap_or(0),
    }
}

/// GET /api/admin/companies
pub async fn list(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Company>>> {
    Ok(Json(state.store.list_companies(CompanyListing::Admin).await?))
}

/// GET /api/companies - active companies in showcase order
pub async fn list_public(State(state): State<AppState>) -> ApiResult<Json<Vec<Company>>> {
    Ok(Json(state.store.list_companies(CompanyListing::Public).await?))
}

/// GET /api/companies/{slug}
pub async fn get_public(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Company>> {
    state
        .store
        .find_company_by_slug(&slug, None)
        .await?
        .filter(|c| c.status == CompanyStatus::Active)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Company"))
}

/// POST /api/admin/companies
pub async fn create(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(mut input): Json<CompanyInput>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    let name =
        non_empty(input.name.take()).ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let slug = resolve_slug(input.slug.as_deref(), &name)?;
    if state.store.find_company_by_slug(&slug, None).await?.is_some() {
        return Err(ApiError::bad_request(DUPLICATE_SLUG));
    }

    let company = state
        .store
        .create_company(merge(None, input, slug, name))
        .await?;
    tracing::info!(company_id = %company.id, "Created company {}", company.slug);
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/admin/companies/{id}
pub async fn get(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Company>> {
    state
        .store
        .get_company(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Company"))
}

/// PUT /api/admin/companies/{id}
pub async fn update(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut input): Json<CompanyInput>,
) -> ApiResult<Json<Company>> {
    let existing = state
        .store
        .get_company(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company"))?;

    let name = non_empty(input.name.take()).unwrap_or_else(|| existing.name.clone());
    let slug = match input.slug.take() {
        Some(slug) => resolve_slug(Some(&slug), &name)?,
        None => existing.slug.clone(),
    };
    if state
        .store
        .find_company_by_slug(&slug, Some(id))
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request(DUPLICATE_SLUG));
    }

    state
        .store
        .update_company(id, merge(Some(&existing), input, slug, name))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Company"))
}

/// DELETE /api/admin/companies/{id}
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_company(id).await? {
        return Err(ApiError::not_found("Company"));
    }
    tracing::info!(company_id = %id, "Deleted company");
    Ok(Json(MessageResponse {
        message: "Company deleted successfully".to_string(),
    }))
}
