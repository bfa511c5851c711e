//! Shared application state handed to every route.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Store;
use crate::email::EmailService;
use crate::routes::auth::LoginLimiter;
use crate::storage::BlobStorage;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub email: Arc<EmailService>,
    pub blobs: Arc<dyn BlobStorage>,
    pub config: Arc<AppConfig>,
    /// Per-IP login attempt window.
    pub login_limiter: Arc<LoginLimiter>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        email: EmailService,
        blobs: Arc<dyn BlobStorage>,
    ) -> Self {
        let login_limiter = LoginLimiter::new(
            config.session.login_max_attempts,
            config.session.login_window_secs,
        );
        Self {
            store,
            email: Arc::new(email),
            blobs,
            config: Arc::new(config),
            login_limiter: Arc::new(login_limiter),
        }
    }
}
