/**
 * Routes Module
 * API route handlers and the validation helpers they share
 */
pub mod auth;
pub mod blog;
pub mod campaigns;
pub mod categories;
pub mod companies;
pub mod dashboard;
pub mod health;
pub mod newsletter;
pub mod posts;
pub mod seo;
pub mod subscribers;
pub mod tags;
pub mod upload;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub use crate::error::ErrorResponse;

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Validation
// ============================================================================

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Sanitize HTML content using ammonia
pub fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Trimmed value, with blank strings treated as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Use the explicit slug when one is given, otherwise derive it from `name`.
pub fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, ApiError> {
    let slug = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => slug::slugify(name),
    };
    if !is_valid_slug(&slug) {
        return Err(ApiError::bad_request(
            "Invalid slug: use lowercase letters, numbers, and hyphens",
        ));
    }
    Ok(slug)
}

/// Lower-cased, trimmed email, or 400 when it does not look like an address.
pub fn normalize_email(email: Option<&str>) -> Result<String, ApiError> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    if !is_valid_email(email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(email.to_lowercase())
}
