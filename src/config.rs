//! Application configuration, read once from the environment at startup.

use std::path::PathBuf;

/// Site identity used by SEO documents and outbound email.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub url: String,
    pub name: String,
    pub author: String,
    pub job_title: String,
    pub description: String,
    pub default_image: String,
    pub twitter_handle: String,
    pub social_links: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            name: "Portfolio".to_string(),
            author: "Site Owner".to_string(),
            job_title: "CEO & Entrepreneur".to_string(),
            description: "Building companies and sharing insights on business, technology, and leadership."
                .to_string(),
            default_image: "/og-image.jpg".to_string(),
            twitter_handle: String::new(),
            social_links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub secure_cookie: bool,
    pub login_max_attempts: usize,
    pub login_window_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24 * 30,
            secure_cookie: false,
            login_max_attempts: 5,
            login_window_secs: 60,
        }
    }
}

/// Password for the bootstrap admin, either plain text or an existing bcrypt hash.
#[derive(Debug, Clone)]
pub enum AdminPassword {
    Plain(String),
    Hash(String),
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: AdminPassword,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from: "Newsletter <onboarding@resend.dev>".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub blob_token: Option<String>,
    pub upload_dir: PathBuf,
    pub public_base: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_token: None,
            upload_dir: PathBuf::from("uploads"),
            public_base: "/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub database_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub site: SiteConfig,
    pub session: SessionConfig,
    pub admin: Option<AdminBootstrap>,
    pub email: EmailConfig,
    pub storage: StorageConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            environment: "development".to_string(),
            database_url: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            site: SiteConfig::default(),
            session: SessionConfig::default(),
            admin: None,
            email: EmailConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}

fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    /// Build the configuration from environment variables, falling back to
    /// development defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();
        let environment = var_or("ENVIRONMENT", &defaults.environment);
        let is_production = environment == "production";

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|s| list(&s))
            .filter(|origins| !origins.is_empty())
            .or_else(|| var("FRONTEND_ORIGIN").map(|origin| vec![origin]))
            .unwrap_or(defaults.allowed_origins);

        let site_defaults = SiteConfig::default();
        let site = SiteConfig {
            url: var_or("SITE_URL", &site_defaults.url)
                .trim_end_matches('/')
                .to_string(),
            name: var_or("SITE_NAME", &site_defaults.name),
            author: var_or("SITE_AUTHOR", &site_defaults.author),
            job_title: var_or("SITE_JOB_TITLE", &site_defaults.job_title),
            description: var_or("SITE_DESCRIPTION", &site_defaults.description),
            default_image: var_or("SITE_DEFAULT_IMAGE", &site_defaults.default_image),
            twitter_handle: var_or("TWITTER_HANDLE", &site_defaults.twitter_handle),
            social_links: var("SITE_SOCIAL_LINKS")
                .map(|s| list(&s))
                .unwrap_or_default(),
        };

        let session_defaults = SessionConfig::default();
        let session = SessionConfig {
            ttl_hours: parse_or("SESSION_TTL_HOURS", session_defaults.ttl_hours),
            secure_cookie: is_production,
            login_max_attempts: parse_or("LOGIN_MAX_ATTEMPTS", session_defaults.login_max_attempts),
            login_window_secs: parse_or("LOGIN_WINDOW_SECS", session_defaults.login_window_secs),
        };

        let admin = var("ADMIN_EMAIL").and_then(|email| {
            let password = var("ADMIN_HASH_PASSWORD")
                .map(AdminPassword::Hash)
                .or_else(|| var("ADMIN_PASSWORD").map(AdminPassword::Plain))?;
            Some(AdminBootstrap {
                email,
                password,
                name: var_or("ADMIN_NAME", "Admin User"),
            })
        });

        let email_defaults = EmailConfig::default();
        let email = EmailConfig {
            resend_api_key: var("RESEND_API_KEY"),
            from: var_or("EMAIL_FROM", &email_defaults.from),
        };

        let storage_defaults = StorageConfig::default();
        let storage = StorageConfig {
            blob_token: var("BLOB_READ_WRITE_TOKEN"),
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(storage_defaults.upload_dir),
            public_base: storage_defaults.public_base,
        };

        Self {
            host: var_or("HOST", &defaults.host),
            port: parse_or("PORT", defaults.port),
            environment,
            database_url: var("DATABASE_URL"),
            allowed_origins,
            site,
            session,
            admin,
            email,
            storage,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Absolute URL for a site-relative path.
    pub fn site_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.site.url, path)
    }
}
