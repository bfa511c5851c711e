//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Returned when a TEXT column holds a value outside the known enum variants.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Enums stored as upper-case TEXT columns.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(Role {
    Admin => "ADMIN",
});

text_enum!(CompanyStatus {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
    Sold => "SOLD",
    Acquired => "ACQUIRED",
});

text_enum!(SubscriberStatus {
    Active => "ACTIVE",
    Unsubscribed => "UNSUBSCRIBED",
});

text_enum!(
    /// Lifecycle of a newsletter campaign. Only `SENT` is terminal.
    CampaignStatus {
        Draft => "DRAFT",
        Scheduled => "SCHEDULED",
        Sending => "SENDING",
        Sent => "SENT",
        Cancelled => "CANCELLED",
    }
);

// ============================================================================
// Users & sessions
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

/// Admin login session; only the sha-256 of the cookie token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Blog taxonomy
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub category: Category,
    pub post_count: i64,
}

#[derive(Debug, Clone)]
pub struct CategoryFields {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub tag: Tag,
    pub post_count: i64,
}

#[derive(Debug, Clone)]
pub struct TagFields {
    pub name: String,
    pub slug: String,
}

/// Which posts a taxonomy count includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Published,
}

// ============================================================================
// Blog posts
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub feature_image: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A post together with its author, category and tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostWithRelations {
    #[serde(flatten)]
    pub post: BlogPost,
    pub author: Option<AuthorSummary>,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

/// Column values written on create and update.
#[derive(Debug, Clone)]
pub struct PostFields {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub feature_image: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Only published posts, newest publication first. Otherwise every post,
    /// newest creation first.
    pub published_only: bool,
    pub category_slug: Option<String>,
    pub tag_slug: Option<String>,
    pub limit: Option<i64>,
    pub skip: i64,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Self::default()
        }
    }
}

// ============================================================================
// Companies
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CompanyStatus,
    pub founded: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub image: Option<String>,
    pub featured: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CompanyFields {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub status: CompanyStatus,
    pub founded: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub image: Option<String>,
    pub featured: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyListing {
    /// Every company, newest first.
    Admin,
    /// Active companies: featured first, then sort order, then newest.
    Public,
}

// ============================================================================
// Newsletter
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscriber {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: SubscriberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCampaign {
    pub id: Uuid,
    pub subject: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub status: CampaignStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub recipient_count: i32,
    pub open_count: i32,
    pub click_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CampaignFields {
    pub subject: String,
    pub content: String,
    pub status: CampaignStatus,
}

/// Counts shown on the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub categories: i64,
    pub tags: i64,
    pub active_subscribers: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_round_trips_through_strings() {
        assert_eq!("SOLD".parse::<CompanyStatus>().unwrap(), CompanyStatus::Sold);
        assert_eq!(CampaignStatus::Cancelled.as_str(), "CANCELLED");
        assert_eq!(
            SubscriberStatus::try_from("UNSUBSCRIBED".to_string()).unwrap(),
            SubscriberStatus::Unsubscribed
        );
    }

    #[test]
    fn test_text_enum_rejects_unknown_values() {
        let err = "active".parse::<SubscriberStatus>().unwrap_err();
        assert_eq!(err.kind, "SubscriberStatus");
        assert_eq!(err.value, "active");
    }

    #[test]
    fn test_text_enum_serializes_upper_case() {
        let json = serde_json::to_string(&CampaignStatus::Draft).unwrap();
        assert_eq!(json, "\"DRAFT\"");
        let status: CompanyStatus = serde_json::from_str("\"ACQUIRED\"").unwrap();
        assert_eq!(status, CompanyStatus::Acquired);
    }

    #[test]
    fn test_session_liveness() {
        let now = Utc::now();
        let mut session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "h".to_string(),
            expires_at: now + chrono::Duration::hours(1),
            revoked: false,
            created_at: now,
        };
        assert!(session.is_live(now));
        session.revoked = true;
        assert!(!session.is_live(now));
        session.revoked = false;
        session.expires_at = now - chrono::Duration::seconds(1);
        assert!(!session.is_live(now));
    }

    #[test]
    fn test_post_with_relations_flattens_post_fields() {
        let now = Utc::now();
        let post = BlogPostWithRelations {
            post: BlogPost {
                id: Uuid::new_v4(),
                title: "Hello".to_string(),
                slug: "hello".to_string(),
                content: "<p>x</p>".to_string(),
                excerpt: None,
                feature_image: None,
                published: true,
                published_at: Some(now),
                author_id: Uuid::new_v4(),
                category_id: None,
                created_at: now,
                updated_at: now,
            },
            author: None,
            category: None,
            tags: vec![],
        };
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["slug"], "hello");
        assert_eq!(value["published"], true);
        assert!(value["publishedAt"].is_string());
        assert!(value["tags"].as_array().unwrap().is_empty());
    }
}
