//! In-process [`Store`] used when no database is configured and by the tests.
//!
//! Mirrors the constraints of the Postgres schema: unique slugs and emails
//! produce [`StoreError::Conflict`], and deleting a category or tag that posts
//! still reference produces [`StoreError::InUse`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    AuthorSummary, BlogPost, BlogPostWithRelations, CampaignFields, CampaignStatus, Category,
    CategoryFields, CategoryWithCount, Company, CompanyFields, CompanyListing, CompanyStatus,
    DashboardStats, EmailCampaign, NewSession, NewUser, NewsletterSubscriber, PostFields,
    PostFilter, PostScope, Session, SubscriberStatus, Tag, TagFields, TagWithCount, User,
};
use super::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<Session>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    posts: Vec<BlogPost>,
    /// post id -> tag ids
    post_tags: HashMap<Uuid, Vec<Uuid>>,
    companies: Vec<Company>,
    subscribers: Vec<NewsletterSubscriber>,
    campaigns: Vec<EmailCampaign>,
}

impl Tables {
    fn with_relations(&self, post: &BlogPost) -> BlogPostWithRelations {
        let author = self
            .users
            .iter()
            .find(|u| u.id == post.author_id)
            .map(|u| AuthorSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
            });
        let category = post
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id).cloned());
        let tag_ids = self.post_tags.get(&post.id).cloned().unwrap_or_default();
        let mut tags: Vec<Tag> = self
            .tags
            .iter()
            .filter(|t| tag_ids.contains(&t.id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        BlogPostWithRelations {
            post: post.clone(),
            author,
            category,
            tags,
        }
    }

    fn post_counts_for_category(&self, id: Uuid, scope: PostScope) -> i64 {
        self.posts
            .iter()
            .filter(|p| p.category_id == Some(id))
            .filter(|p| scope == PostScope::All || p.published)
            .count() as i64
    }

    fn post_counts_for_tag(&self, id: Uuid, scope: PostScope) -> i64 {
        self.posts
            .iter()
            .filter(|p| {
                self.post_tags
                    .get(&p.id)
                    .is_some_and(|tags| tags.contains(&id))
            })
            .filter(|p| scope == PostScope::All || p.published)
            .count() as i64
    }

    fn check_post_refs(&self, fields: &PostFields, tag_ids: Option<&[Uuid]>) -> StoreResult<()> {
        if let Some(category_id) = fields.category_id {
            if !self.categories.iter().any(|c| c.id == category_id) {
                return Err(StoreError::InUse("blog_posts_category_id_fkey".to_string()));
            }
        }
        if let Some(tag_ids) = tag_ids {
            if tag_ids.iter().any(|id| !self.tags.iter().any(|t| t.id == *id)) {
                return Err(StoreError::InUse("blog_post_tags_tag_id_fkey".to_string()));
            }
        }
        Ok(())
    }
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<std::time::Duration> {
        let start = std::time::Instant::now();
        let _tables = self.tables.read().await;
        Ok(start.elapsed())
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.users.len() as i64)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            let now = Utc::now();
            user.last_login_at = Some(now);
            user.updated_at = now;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    async fn create_session(&self, session: NewSession) -> StoreResult<Session> {
        let mut tables = self.tables.write().await;
        if tables
            .sessions
            .iter()
            .any(|s| s.token_hash == session.token_hash)
        {
            return Err(StoreError::Conflict("sessions_token_hash_key".to_string()));
        }
        let session = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            token_hash: session.token_hash,
            expires_at: session.expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        tables.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_session(&self, token_hash: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for session in tables
            .sessions
            .iter_mut()
            .filter(|s| s.token_hash == token_hash)
        {
            session.revoked = true;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    async fn list_categories(&self, scope: PostScope) -> StoreResult<Vec<CategoryWithCount>> {
        let tables = self.tables.read().await;
        let mut out: Vec<CategoryWithCount> = tables
            .categories
            .iter()
            .map(|c| CategoryWithCount {
                category: c.clone(),
                post_count: tables.post_counts_for_category(c.id, scope),
            })
            .collect();
        out.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(out)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<CategoryWithCount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| CategoryWithCount {
                category: c.clone(),
                post_count: tables.post_counts_for_category(c.id, PostScope::All),
            }))
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> StoreResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .iter()
            .find(|c| c.slug == slug && Some(c.id) != excluding)
            .cloned())
    }

    async fn create_category(&self, fields: CategoryFields) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.categories.iter().any(|c| c.slug == fields.slug) {
            return Err(StoreError::Conflict("categories_slug_key".to_string()));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: fields.name,
            slug: fields.slug,
            description: fields.description,
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        fields: CategoryFields,
    ) -> StoreResult<Option<Category>> {
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .iter()
            .any(|c| c.slug == fields.slug && c.id != id)
        {
            return Err(StoreError::Conflict("categories_slug_key".to_string()));
        }
        Ok(tables
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .map(|c| {
                c.name = fields.name;
                c.slug = fields.slug;
                c.description = fields.description;
                c.updated_at = Utc::now();
                c.clone()
            }))
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.posts.iter().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::InUse("blog_posts_category_id_fkey".to_string()));
        }
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() < before)
    }

    async fn count_posts_in_category(&self, id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.post_counts_for_category(id, PostScope::All))
    }

    // ------------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------------

    async fn list_tags(&self, scope: PostScope) -> StoreResult<Vec<TagWithCount>> {
        let tables = self.tables.read().await;
        let mut out: Vec<TagWithCount> = tables
            .tags
            .iter()
            .map(|t| TagWithCount {
                tag: t.clone(),
                post_count: tables.post_counts_for_tag(t.id, scope),
            })
            .collect();
        out.sort_by(|a, b| a.tag.name.cmp(&b.tag.name));
        Ok(out)
    }

    async fn get_tag(&self, id: Uuid) -> StoreResult<Option<TagWithCount>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.iter().find(|t| t.id == id).map(|t| TagWithCount {
            tag: t.clone(),
            post_count: tables.post_counts_for_tag(t.id, PostScope::All),
        }))
    }

    async fn find_tags(&self, ids: &[Uuid]) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_tag_by_slug(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> StoreResult<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tags
            .iter()
            .find(|t| t.slug == slug && Some(t.id) != excluding)
            .cloned())
    }

    async fn create_tag(&self, fields: TagFields) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        if tables.tags.iter().any(|t| t.slug == fields.slug) {
            return Err(StoreError::Conflict("tags_slug_key".to_string()));
        }
        let now = Utc::now();
        let tag = Tag {
            id: Uuid::new_v4(),
            name: fields.name,
            slug: fields.slug,
            created_at: now,
            updated_at: now,
        };
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: Uuid, fields: TagFields) -> StoreResult<Option<Tag>> {
        let mut tables = self.tables.write().await;
        if tables
            .tags
            .iter()
            .any(|t| t.slug == fields.slug && t.id != id)
        {
            return Err(StoreError::Conflict("tags_slug_key".to_string()));
        }
        Ok(tables.tags.iter_mut().find(|t| t.id == id).map(|t| {
            t.name = fields.name;
            t.slug = fields.slug;
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn delete_tag(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.post_tags.values().any(|tags| tags.contains(&id)) {
            return Err(StoreError::InUse("blog_post_tags_tag_id_fkey".to_string()));
        }
        let before = tables.tags.len();
        tables.tags.retain(|t| t.id != id);
        Ok(tables.tags.len() < before)
    }

    async fn count_posts_with_tag(&self, id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.post_counts_for_tag(id, PostScope::All))
    }

    // ------------------------------------------------------------------------
    // Blog posts
    // ------------------------------------------------------------------------

    async fn list_posts(&self, filter: PostFilter) -> StoreResult<Vec<BlogPostWithRelations>> {
        let tables = self.tables.read().await;

        let category_id = match &filter.category_slug {
            Some(slug) => match tables.categories.iter().find(|c| &c.slug == slug) {
                Some(c) => Some(c.id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };
        let tag_id = match &filter.tag_slug {
            Some(slug) => match tables.tags.iter().find(|t| &t.slug == slug) {
                Some(t) => Some(t.id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut posts: Vec<&BlogPost> = tables
            .posts
            .iter()
            .filter(|p| !filter.published_only || p.published)
            .filter(|p| category_id.is_none() || p.category_id == category_id)
            .filter(|p| match tag_id {
                Some(tag_id) => tables
                    .post_tags
                    .get(&p.id)
                    .is_some_and(|tags| tags.contains(&tag_id)),
                None => true,
            })
            .collect();

        if filter.published_only {
            // NULLS LAST on published_at, then newest creation.
            posts.sort_by(|a, b| {
                b.published_at
                    .is_some()
                    .cmp(&a.published_at.is_some())
                    .then(b.published_at.cmp(&a.published_at))
                    .then(b.created_at.cmp(&a.created_at))
            });
        } else {
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        let skip = filter.skip.max(0) as usize;
        let limit = filter
            .limit
            .map(|l| l.max(0) as usize)
            .unwrap_or(usize::MAX);

        Ok(posts
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|p| tables.with_relations(p))
            .collect())
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<BlogPostWithRelations>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| tables.with_relations(p)))
    }

    async fn get_post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPostWithRelations>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .map(|p| tables.with_relations(p)))
    }

    async fn find_post_by_slug(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> StoreResult<Option<BlogPost>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.slug == slug && Some(p.id) != excluding)
            .cloned())
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        fields: PostFields,
        tag_ids: Vec<Uuid>,
    ) -> StoreResult<BlogPostWithRelations> {
        let mut tables = self.tables.write().await;
        if tables.posts.iter().any(|p| p.slug == fields.slug) {
            return Err(StoreError::Conflict("blog_posts_slug_key".to_string()));
        }
        tables.check_post_refs(&fields, Some(&tag_ids))?;

        let now = Utc::now();
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: fields.title,
            slug: fields.slug,
            content: fields.content,
            excerpt: fields.excerpt,
            feature_image: fields.feature_image,
            published: fields.published,
            published_at: fields.published_at,
            author_id,
            category_id: fields.category_id,
            created_at: now,
            updated_at: now,
        };
        tables.post_tags.insert(post.id, dedup(tag_ids));
        tables.posts.push(post.clone());
        Ok(tables.with_relations(&post))
    }

    async fn update_post(
        &self,
        id: Uuid,
        fields: PostFields,
        tag_ids: Option<Vec<Uuid>>,
    ) -> StoreResult<Option<BlogPostWithRelations>> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == id) {
            return Ok(None);
        }
        if tables
            .posts
            .iter()
            .any(|p| p.slug == fields.slug && p.id != id)
        {
            return Err(StoreError::Conflict("blog_posts_slug_key".to_string()));
        }
        tables.check_post_refs(&fields, tag_ids.as_deref())?;

        if let Some(tag_ids) = tag_ids {
            tables.post_tags.insert(id, dedup(tag_ids));
        }

        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.title = fields.title;
        post.slug = fields.slug;
        post.content = fields.content;
        post.excerpt = fields.excerpt;
        post.feature_image = fields.feature_image;
        post.published = fields.published;
        post.published_at = fields.published_at;
        post.category_id = fields.category_id;
        post.updated_at = Utc::now();
        let post = post.clone();

        Ok(Some(tables.with_relations(&post)))
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        tables.post_tags.remove(&id);
        Ok(tables.posts.len() < before)
    }

    async fn count_posts(&self, published: Option<bool>) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| published.map_or(true, |flag| p.published == flag))
            .count() as i64)
    }

    // ------------------------------------------------------------------------
    // Companies
    // ------------------------------------------------------------------------

    async fn list_companies(&self, listing: CompanyListing) -> StoreResult<Vec<Company>> {
        let tables = self.tables.read().await;
        let mut companies: Vec<Company> = match listing {
            CompanyListing::Admin => tables.companies.clone(),
            CompanyListing::Public => tables
                .companies
                .iter()
                .filter(|c| c.status == CompanyStatus::Active)
                .cloned()
                .collect(),
        };
        match listing {
            CompanyListing::Admin => companies.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            CompanyListing::Public => companies.sort_by(|a, b| {
                b.featured
                    .cmp(&a.featured)
                    .then(a.sort_order.cmp(&b.sort_order))
                    .then(b.created_at.cmp(&a.created_at))
            }),
        }
        Ok(companies)
    }

    async fn get_company(&self, id: Uuid) -> StoreResult<Option<Company>> {
        let tables = self.tables.read().await;
        Ok(tables.companies.iter().find(|c| c.id == id).cloned())
    }

    async fn find_company_by_slug(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> StoreResult<Option<Company>> {
        let tables = self.tables.read().await;
        Ok(tables
            .companies
            .iter()
            .find(|c| c.slug == slug && Some(c.id) != excluding)
            .cloned())
    }

    async fn create_company(&self, fields: CompanyFields) -> StoreResult<Company> {
        let mut tables = self.tables.write().await;
        if tables.companies.iter().any(|c| c.slug == fields.slug) {
            return Err(StoreError::Conflict("companies_slug_key".to_string()));
        }
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: fields.name,
            slug: fields.slug,
            description: fields.description,
            industry: fields.industry,
            status: fields.status,
            founded: fields.founded,
            website: fields.website,
            logo: fields.logo,
            image: fields.image,
            featured: fields.featured,
            sort_order: fields.sort_order,
            created_at: now,
            updated_at: now,
        };
        tables.companies.push(company.clone());
        Ok(company)
    }

    async fn update_company(
        &self,
        id: Uuid,
        fields: CompanyFields,
    ) -> StoreResult<Option<Company>> {
        let mut tables = self.tables.write().await;
        if tables
            .companies
            .iter()
            .any(|c| c.slug == fields.slug && c.id != id)
        {
            return Err(StoreError::Conflict("companies_slug_key".to_string()));
        }
        Ok(tables.companies.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = fields.name;
            c.slug = fields.slug;
            c.description = fields.description;
            c.industry = fields.industry;
            c.status = fields.status;
            c.founded = fields.founded;
            c.website = fields.website;
            c.logo = fields.logo;
            c.image = fields.image;
            c.featured = fields.featured;
            c.sort_order = fields.sort_order;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_company(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.companies.len();
        tables.companies.retain(|c| c.id != id);
        Ok(tables.companies.len() < before)
    }

    // ------------------------------------------------------------------------
    // Newsletter subscribers
    // ------------------------------------------------------------------------

    async fn list_subscribers(
        &self,
        status: Option<SubscriberStatus>,
    ) -> StoreResult<Vec<NewsletterSubscriber>> {
        let tables = self.tables.read().await;
        let mut subscribers: Vec<NewsletterSubscriber> = tables
            .subscribers
            .iter()
            .filter(|s| status.map_or(true, |status| s.status == status))
            .cloned()
            .collect();
        subscribers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subscribers)
    }

    async fn get_subscriber(&self, id: Uuid) -> StoreResult<Option<NewsletterSubscriber>> {
        let tables = self.tables.read().await;
        Ok(tables.subscribers.iter().find(|s| s.id == id).cloned())
    }

    async fn find_subscriber_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<NewsletterSubscriber>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscribers
            .iter()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn create_subscriber(
        &self,
        email: &str,
        name: Option<String>,
    ) -> StoreResult<NewsletterSubscriber> {
        let mut tables = self.tables.write().await;
        if tables.subscribers.iter().any(|s| s.email == email) {
            return Err(StoreError::Conflict(
                "newsletter_subscribers_email_key".to_string(),
            ));
        }
        let now = Utc::now();
        let subscriber = NewsletterSubscriber {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name,
            status: SubscriberStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables.subscribers.push(subscriber.clone());
        Ok(subscriber)
    }

    async fn set_subscriber_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
    ) -> StoreResult<Option<NewsletterSubscriber>> {
        let mut tables = self.tables.write().await;
        Ok(tables.subscribers.iter_mut().find(|s| s.id == id).map(|s| {
            s.status = status;
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn delete_subscriber(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.subscribers.len();
        tables.subscribers.retain(|s| s.id != id);
        Ok(tables.subscribers.len() < before)
    }

    // ------------------------------------------------------------------------
    // Email campaigns
    // ------------------------------------------------------------------------

    async fn list_campaigns(&self) -> StoreResult<Vec<EmailCampaign>> {
        let tables = self.tables.read().await;
        let mut campaigns = tables.campaigns.clone();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    async fn get_campaign(&self, id: Uuid) -> StoreResult<Option<EmailCampaign>> {
        let tables = self.tables.read().await;
        Ok(tables.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn create_campaign(&self, subject: &str, content: &str) -> StoreResult<EmailCampaign> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let campaign = EmailCampaign {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            content: content.to_string(),
            status: CampaignStatus::Draft,
            sent_at: None,
            recipient_count: 0,
            open_count: 0,
            click_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.campaigns.push(campaign.clone());
        Ok(campaign)
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        fields: CampaignFields,
    ) -> StoreResult<Option<EmailCampaign>> {
        let mut tables = self.tables.write().await;
        Ok(tables.campaigns.iter_mut().find(|c| c.id == id).map(|c| {
            c.subject = fields.subject;
            c.content = fields.content;
            c.status = fields.status;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn mark_campaign_sent(
        &self,
        id: Uuid,
        recipient_count: i32,
    ) -> StoreResult<Option<EmailCampaign>> {
        let mut tables = self.tables.write().await;
        Ok(tables.campaigns.iter_mut().find(|c| c.id == id).map(|c| {
            let now = Utc::now();
            c.status = CampaignStatus::Sent;
            c.sent_at = Some(now);
            c.recipient_count = recipient_count;
            c.updated_at = now;
            c.clone()
        }))
    }

    async fn delete_campaign(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.campaigns.len();
        tables.campaigns.retain(|c| c.id != id);
        Ok(tables.campaigns.len() < before)
    }

    async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let tables = self.tables.read().await;
        let total_posts = tables.posts.len() as i64;
        let published_posts = tables.posts.iter().filter(|p| p.published).count() as i64;
        Ok(DashboardStats {
            total_posts,
            published_posts,
            draft_posts: total_posts - published_posts,
            categories: tables.categories.len() as i64,
            tags: tables.tags.len() as i64,
            active_subscribers: tables
                .subscribers
                .iter()
                .filter(|s| s.status == SubscriberStatus::Active)
                .count() as i64,
        })
    }
}
