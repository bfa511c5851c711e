/**
 * Authentication Routes
 * Credentials login backed by server-side sessions in an HttpOnly cookie
 */
use axum::{
    extract::{ConnectInfo, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, net::SocketAddr};
use tokio::sync::Mutex;

use crate::config::{AdminBootstrap, AdminPassword};
use crate::db::models::{NewSession, NewUser, Role, User};
use crate::db::Store;
use crate::error::{ApiError, ApiResult};
use crate::routes::SuccessResponse;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_token";

const SESSION_TOKEN_LEN: usize = 64;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: User,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn generate_session_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), SESSION_TOKEN_LEN)
}

/// Sessions are looked up by the SHA-256 of the cookie value; the raw token
/// never reaches the database.
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Session token from the cookie, falling back to an `Authorization: Bearer` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    extract_cookie_token(headers).or_else(|| extract_bearer_token(headers))
}

pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_header(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::Internal(format!("invalid cookie header: {}", e)))
}

/// bcrypt is CPU-heavy; keep it off the async executor.
pub async fn hash_password(plain: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash(plain, DEFAULT_COST))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

async fn verify_password(plain: String, password_hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify(plain, &password_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password check task failed: {}", e)))?
        .or_else(|e| {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            Ok(false)
        })
}

/// Resolve a raw session token to its admin user, if the session is live.
pub async fn resolve_session(store: &dyn Store, token: &str) -> ApiResult<Option<User>> {
    let Some(session) = store.find_session(&hash_session_token(token)).await? else {
        return Ok(None);
    };
    if !session.is_live(Utc::now()) {
        return Ok(None);
    }
    Ok(store
        .find_user(session.user_id)
        .await?
        .filter(|user| user.role == Role::Admin))
}

/// Create the configured admin account unless a user with that email exists.
pub async fn bootstrap_admin(store: &dyn Store, admin: &AdminBootstrap) -> ApiResult<Option<User>> {
    if store.find_user_by_email(&admin.email).await?.is_some() {
        tracing::debug!("Admin user {} already exists", admin.email);
        return Ok(None);
    }

    let password_hash = match &admin.password {
        AdminPassword::Hash(existing) => existing.clone(),
        AdminPassword::Plain(plain) => hash_password(plain.clone()).await?,
    };

    let user = store
        .create_user(NewUser {
            email: admin.email.trim().to_lowercase(),
            password_hash,
            name: admin.name.clone(),
            role: Role::Admin,
        })
        .await?;
    tracing::info!(user_id = %user.id, "Created admin user {}", user.email);
    Ok(Some(user))
}

// ============================================================================
// Rate limiting
// ============================================================================

/// Fixed-window attempt counter keyed by client IP.
pub struct LoginLimiter {
    max_attempts: usize,
    window_secs: i64,
    attempts: Mutex<HashMap<String, (i64, usize)>>,
}

impl LoginLimiter {
    pub fn new(max_attempts: usize, window_secs: i64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window_secs: window_secs.max(1),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Records an attempt and reports whether it is allowed.
    pub async fn check(&self, ip: &str) -> bool {
        self.check_at(ip, Utc::now().timestamp()).await
    }

    async fn check_at(&self, ip: &str, now: i64) -> bool {
        let mut attempts = self.attempts.lock().await;

        // Drop expired windows so the map only holds active clients.
        attempts.retain(|_, (started, _)| now - *started < self.window_secs);

        let entry = attempts.entry(ip.to_string()).or_insert((now, 0));
        if entry.1 >= self.max_attempts {
            return false;
        }
        entry.1 += 1;
        true
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// An authenticated admin. Rejects with 401 before the body is read.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user: User,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let user = resolve_session(state.store.as_ref(), &token)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(AdminSession { user })
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    let ip = addr.ip().to_string();
    if !state.login_limiter.check(&ip).await {
        tracing::warn!(%ip, "Login rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }

    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    if !crate::routes::is_valid_email(email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }

    let Some(user) = state.store.find_user_by_email(email).await? else {
        tracing::warn!("Login attempt for unknown user");
        return Err(ApiError::Unauthorized);
    };
    if !verify_password(payload.password, user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized);
    }

    let token = generate_session_token();
    let ttl = Duration::hours(state.config.session.ttl_hours);
    state
        .store
        .create_session(NewSession {
            user_id: user.id,
            token_hash: hash_session_token(&token),
            expires_at: Utc::now() + ttl,
        })
        .await?;
    state.store.record_login(user.id).await?;

    tracing::info!(user_id = %user.id, "Admin logged in");

    let cookie = session_cookie(
        &token,
        ttl.num_seconds(),
        state.config.session.secure_cookie,
    );
    let mut response = Json(LoginResponse {
        success: true,
        user,
    })
    .into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, cookie_header(&cookie)?);
    Ok(response)
}

/// POST /api/auth/logout
/// Idempotent: always succeeds and clears the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.store.revoke_session(&hash_session_token(&token)).await {
            tracing::error!("Failed to revoke session: {}", e);
        }
    }

    let cookie = session_cookie("", 0, state.config.session.secure_cookie);
    let mut response = Json(SuccessResponse { success: true }).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, cookie_header(&cookie)?);
    Ok(response)
}

/// GET /api/auth/session
pub async fn session(admin: AdminSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: true,
        user: admin.user,
    })
}
