//! Portfolio CMS - library for app logic and testing

pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;
pub mod storage;

#[cfg(test)]
pub mod test_support;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::{memory::MemoryStore, postgres::PgStore, DbConfig, Store};
use crate::email::EmailService;
use crate::routes::{
    auth, blog, campaigns, categories, companies, dashboard, health, newsletter, posts, seo,
    subscribers, tags, upload,
};
use crate::state::AppState;

const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// CORS for the configured frontend origins, with credentials so the session
/// cookie is sent.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/tags", get(tags::list).post(tags::create))
        .route(
            "/tags/{id}",
            get(tags::get).put(tags::update).delete(tags::delete),
        )
        .route("/posts", get(posts::list).post(posts::create))
        .route(
            "/posts/{id}",
            get(posts::get).put(posts::update).delete(posts::delete),
        )
        .route("/companies", get(companies::list).post(companies::create))
        .route(
            "/companies/{id}",
            get(companies::get)
                .put(companies::update)
                .delete(companies::delete),
        )
        .route(
            "/subscribers",
            get(subscribers::list).post(subscribers::create),
        )
        .route(
            "/subscribers/{id}",
            axum::routing::patch(subscribers::update_status).delete(subscribers::delete),
        )
        .route(
            "/newsletter/campaigns",
            get(campaigns::list).post(campaigns::create),
        )
        .route(
            "/newsletter/campaigns/{id}",
            get(campaigns::get)
                .put(campaigns::update)
                .delete(campaigns::delete),
        )
        .route("/newsletter/campaigns/{id}/send", post(campaigns::send))
        .route("/newsletter/campaigns/{id}/test", post(campaigns::send_test))
        .route("/stats", get(dashboard::stats))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::session))
        .route("/api/blog", get(blog::list_posts))
        .route("/api/blog/featured", get(blog::featured_post))
        .route("/api/blog/{slug}", get(blog::get_post))
        .route("/api/categories", get(categories::list_public))
        .route("/api/tags", get(tags::list_public))
        .route("/api/companies", get(companies::list_public))
        .route("/api/companies/{slug}", get(companies::get_public))
        .route("/api/newsletter/subscribe", post(newsletter::subscribe))
        .route(
            "/api/newsletter/unsubscribe",
            get(newsletter::unsubscribe).post(newsletter::unsubscribe),
        )
        .route("/api/seo/person", get(seo::person))
        .route("/api/seo/organization", get(seo::organization))
        .nest("/api/admin", admin_routes())
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/robots.txt", get(seo::robots))
        .route("/rss.xml", get(seo::rss_feed))
        .route("/health", get(health::health_ping))
        .route("/health/ready", get(health::health_ready))
        // Global 2 MB request body cap for everything except uploads
        .layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT))
}

fn upload_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/upload/image",
            post(upload::upload_image).delete(upload::delete_image),
        )
        // Room for the multipart framing around a maximum-size image
        .layer(DefaultBodyLimit::max(upload::MAX_FILE_SIZE + 64 * 1024))
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config);
    let mut app = api_routes().merge(upload_routes());

    if state.config.storage.blob_token.is_none() {
        app = app.nest_service(
            &state.config.storage.public_base,
            ServeDir::new(&state.config.storage.upload_dir),
        );
    }

    app.layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(&DbConfig::from_env(url.clone()))
                .await
                .context("failed to connect to the database")?;
            db::run_migrations(&pool)
                .await
                .context("failed to run database migrations")?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set. Using the in-memory store; data is lost on restart.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Guards must be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init(config.is_production());

    health::init_start_time();

    let store = open_store(&config).await?;

    match &config.admin {
        Some(admin) => {
            auth::bootstrap_admin(store.as_ref(), admin).await?;
        }
        None if config.is_production() => tracing::warn!(
            "SECURITY: ADMIN_EMAIL and ADMIN_PASSWORD/ADMIN_HASH_PASSWORD are not set. \
             No admin account will be created."
        ),
        None => tracing::info!("No bootstrap admin configured"),
    }

    let email = EmailService::new(
        email::mailer_from_config(&config.email),
        config.site.clone(),
        config.email.from.clone(),
    )
    .context("failed to load email templates")?;
    let blobs = storage::blob_storage_from_config(&config.storage);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid HOST/PORT configuration")?;

    let state = AppState::new(config, store, email, blobs);
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")
}
