//! Shared fixtures for route tests: an in-memory app, fakes for the mailer and
//! blob store, and request helpers.

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::memory::MemoryStore;
use crate::db::models::{
    BlogPostWithRelations, Category, CategoryFields, NewSession, NewUser, PostFields, Role, Tag,
    TagFields, User,
};
use crate::email::{EmailError, EmailService, Mailer, MessageId, OutgoingEmail};
use crate::routes::auth::{hash_session_token, SESSION_COOKIE};
use crate::state::AppState;
use crate::storage::{BlobStorage, StorageError, StoredBlob};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

/// Mailer that keeps every message, or rejects them all when `failing`.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<MessageId, EmailError> {
        if self.fail {
            return Err(EmailError::Provider {
                status: 503,
                body: "provider unavailable".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email);
        Ok(format!("msg-{}", sent.len()))
    }
}

#[derive(Default)]
pub struct MemoryBlobStorage {
    objects: Mutex<Vec<(String, usize)>>,
}

impl MemoryBlobStorage {
    pub fn pathnames(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn put(
        &self,
        pathname: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .push((pathname.to_string(), bytes.len()));
        Ok(StoredBlob {
            url: format!("https://blobs.test/{}", pathname),
            pathname: pathname.to_string(),
        })
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let pathname = url.trim_start_matches("https://blobs.test/");
        self.objects.lock().unwrap().retain(|(p, _)| p != pathname);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub blobs: Arc<MemoryBlobStorage>,
}

fn build(config: AppConfig, mailer: RecordingMailer) -> TestApp {
    let mailer = Arc::new(mailer);
    let blobs = Arc::new(MemoryBlobStorage::default());
    let email = EmailService::new(
        mailer.clone(),
        config.site.clone(),
        config.email.from.clone(),
    )
    .unwrap();
    let state = AppState::new(config, Arc::new(MemoryStore::new()), email, blobs.clone());
    TestApp {
        state,
        mailer,
        blobs,
    }
}

pub fn test_app() -> TestApp {
    build(AppConfig::default(), RecordingMailer::default())
}

pub fn test_app_with_config(config: AppConfig) -> TestApp {
    build(config, RecordingMailer::default())
}

pub fn test_app_with_failing_mailer() -> TestApp {
    build(AppConfig::default(), RecordingMailer::failing())
}

/// The full application router with a fixed peer address.
pub fn router(state: &AppState) -> Router {
    crate::create_app(state.clone()).layer(MockConnectInfo(SocketAddr::from((
        [127, 0, 0, 1],
        12345,
    ))))
}

pub async fn raw_request(
    state: &AppState,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    router(state).oneshot(req).await.unwrap()
}

/// Status and JSON body; the body is `Value::Null` when empty or not JSON.
pub async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let res = raw_request(state, method, uri, cookie, body).await;
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Creates the test admin once; later calls return the same user.
pub async fn seed_admin(state: &AppState) -> User {
    if let Some(user) = state.store.find_user_by_email(ADMIN_EMAIL).await.unwrap() {
        return user;
    }
    state
        .store
        .create_user(NewUser {
            email: ADMIN_EMAIL.to_string(),
            password_hash: bcrypt::hash(ADMIN_PASSWORD, 4).unwrap(),
            name: "Admin".to_string(),
            role: Role::Admin,
        })
        .await
        .unwrap()
}

/// A `Cookie` header value for a live admin session.
pub async fn admin_cookie(state: &AppState) -> String {
    let admin = seed_admin(state).await;
    let token = Uuid::new_v4().simple().to_string();
    state
        .store
        .create_session(NewSession {
            user_id: admin.id,
            token_hash: hash_session_token(&token),
            expires_at: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();
    format!("{}={}", SESSION_COOKIE, token)
}

pub async fn seed_category(state: &AppState, slug: &str) -> Category {
    state
        .store
        .create_category(CategoryFields {
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
        })
        .await
        .unwrap()
}

pub async fn seed_tag(state: &AppState, slug: &str) -> Tag {
    state
        .store
        .create_tag(TagFields {
            name: slug.to_string(),
            slug: slug.to_string(),
        })
        .await
        .unwrap()
}

/// A post titled after its slug, authored by the test admin.
pub async fn seed_post(
    state: &AppState,
    slug: &str,
    published: bool,
    category_id: Option<Uuid>,
    tag_ids: Vec<Uuid>,
) -> BlogPostWithRelations {
    let admin = seed_admin(state).await;
    state
        .store
        .create_post(
            admin.id,
            PostFields {
                title: slug.to_string(),
                slug: slug.to_string(),
                content: format!("<p>{}</p>", slug),
                excerpt: None,
                feature_image: None,
                published,
                published_at: published.then(Utc::now),
                category_id,
            },
            tag_ids,
        )
        .await
        .unwrap()
}
