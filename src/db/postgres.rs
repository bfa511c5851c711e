//! PostgreSQL implementation of [`Store`] on top of a sqlx pool.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    AuthorSummary, BlogPost, BlogPostWithRelations, CampaignFields, CampaignStatus, Category,
    CategoryFields, CategoryWithCount, Company, CompanyFields, CompanyListing, CompanyStatus,
    DashboardStats, EmailCampaign, NewSession, NewUser, NewsletterSubscriber, PostFields,
    PostFilter, PostScope, Session, SubscriberStatus, Tag, TagFields, TagWithCount, User,
};
use super::{Store, StoreError, StoreResult};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, last_login_at, created_at, updated_at";
const SESSION_COLUMNS: &str = "id, user_id, token_hash, expires_at, revoked, created_at";
const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";
const TAG_COLUMNS: &str = "id, name, slug, created_at, updated_at";
const POST_COLUMNS: &str = "id, title, slug, content, excerpt, feature_image, published, \
     published_at, author_id, category_id, created_at, updated_at";
const COMPANY_COLUMNS: &str = "id, name, slug, description, industry, status, founded, website, \
     logo, image, featured, sort_order, created_at, updated_at";
const SUBSCRIBER_COLUMNS: &str = "id, email, name, status, created_at, updated_at";
const CAMPAIGN_COLUMNS: &str = "id, subject, content, status, sent_at, recipient_count, \
     open_count, click_count, created_at, updated_at";

#[derive(FromRow)]
struct PostTagRow {
    blog_post_id: Uuid,
    #[sqlx(flatten)]
    tag: Tag,
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load authors, categories and tags for a page of posts with one query each.
    async fn attach_relations(
        &self,
        posts: Vec<BlogPost>,
    ) -> StoreResult<Vec<BlogPostWithRelations>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        let category_ids: Vec<Uuid> = posts.iter().filter_map(|p| p.category_id).collect();

        let authors: HashMap<Uuid, AuthorSummary> =
            sqlx::query_as::<_, AuthorSummary>("SELECT id, name, email FROM users WHERE id = ANY($1)")
                .bind(&author_ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|a| (a.id, a))
                .collect();

        let categories: HashMap<Uuid, Category> = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = ANY($1)",
            CATEGORY_COLUMNS
        ))
        .bind(&category_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

        let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        let rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT bpt.blog_post_id, t.id, t.name, t.slug, t.created_at, t.updated_at
            FROM blog_post_tags bpt
            JOIN tags t ON t.id = bpt.tag_id
            WHERE bpt.blog_post_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            tags.entry(row.blog_post_id).or_default().push(row.tag);
        }

        Ok(posts
            .into_iter()
            .map(|post| BlogPostWithRelations {
                author: authors.get(&post.author_id).cloned(),
                category: post.category_id.and_then(|id| categories.get(&id).cloned()),
                tags: tags.remove(&post.id).unwrap_or_default(),
                post,
            })
            .collect())
    }

    async fn load_post(&self, id: Uuid) -> StoreResult<Option<BlogPostWithRelations>> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blog_posts WHERE id = $1",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match post {
            Some(post) => Ok(self.attach_relations(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn count(&self, sql: &str) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<std::time::Duration> {
        let start = std::time::Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, name, role) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        self.count("SELECT COUNT(*) FROM users").await
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login_at = now(), updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    async fn create_session(&self, session: NewSession) -> StoreResult<Session> {
        Ok(sqlx::query_as::<_, Session>(&format!(
            "INSERT INTO sessions (user_id, token_hash, expires_at) VALUES ($1, $2, $3) \
             RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE token_hash = $1",
            SESSION_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn revoke_session(&self, token_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET revoked = true WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    async fn list_categories(&self, scope: PostScope) -> StoreResult<Vec<CategoryWithCount>> {
        Ok(sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.created_at, c.updated_at,
                   COUNT(p.id) AS post_count
            FROM categories c
            LEFT JOIN blog_posts p
                ON p.category_id = c.id AND (p.published OR NOT $1)
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .bind(scope == PostScope::Published)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<CategoryWithCount>> {
        Ok(sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM blog_posts p WHERE p.category_id = c.id) AS post_count
            FROM categories c
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> StoreResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE slug = $1 AND ($2::UUID IS NULL OR id <> $2)",
            CATEGORY_COLUMNS
        ))
        .bind(slug)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_category(&self, fields: CategoryFields) -> StoreResult<Category> {
        Ok(sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, slug, description) VALUES ($1, $2, $3) RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(&fields.description)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_category(
        &self,
        id: Uuid,
        fields: CategoryFields,
    ) -> StoreResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET name = $1, slug = $2, description = $3, updated_at = now() \
             WHERE id = $4 RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(&fields.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_posts_in_category(&self, id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM blog_posts WHERE category_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------------

    async fn list_tags(&self, scope: PostScope) -> StoreResult<Vec<TagWithCount>> {
        Ok(sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at, t.updated_at,
                   COUNT(p.id) AS post_count
            FROM tags t
            LEFT JOIN blog_post_tags bpt ON bpt.tag_id = t.id
            LEFT JOIN blog_posts p
                ON p.id = bpt.blog_post_id AND (p.published OR NOT $1)
            GROUP BY t.id
            ORDER BY t.name ASC
            "#,
        )
        .bind(scope == PostScope::Published)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_tag(&self, id: Uuid) -> StoreResult<Option<TagWithCount>> {
        Ok(sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at, t.updated_at,
                   (SELECT COUNT(*) FROM blog_post_tags bpt WHERE bpt.tag_id = t.id) AS post_count
            FROM tags t
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_tags(&self, ids: &[Uuid]) -> StoreResult<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(sqlx::query_as::<_, Tag>(&format!(
            "SELECT {} FROM tags WHERE id = ANY($1) ORDER BY name ASC",
            TAG_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_tag_by_slug(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> StoreResult<Option<Tag>> {
        Ok(sqlx::query_as::<_, Tag>(&format!(
            "SELECT {} FROM tags WHERE slug = $1 AND ($2::UUID IS NULL OR id <> $2)",
            TAG_COLUMNS
        ))
        .bind(slug)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_tag(&self, fields: TagFields) -> StoreResult<Tag> {
        Ok(sqlx::query_as::<_, Tag>(&format!(
            "INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING {}",
            TAG_COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.slug)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_tag(&self, id: Uuid, fields: TagFields) -> StoreResult<Option<Tag>> {
        Ok(sqlx::query_as::<_, Tag>(&format!(
            "UPDATE tags SET name = $1, slug = $2, updated_at = now() WHERE id = $3 RETURNING {}",
            TAG_COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_tag(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_posts_with_tag(&self, id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM blog_post_tags WHERE tag_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Blog posts
    // ------------------------------------------------------------------------

    async fn list_posts(&self, filter: PostFilter) -> StoreResult<Vec<BlogPostWithRelations>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM blog_posts p WHERE TRUE",
            POST_COLUMNS
                .split(", ")
                .map(|c| format!("p.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        ));

        if filter.published_only {
            qb.push(" AND p.published = TRUE");
        }
        if let Some(category_slug) = filter.category_slug {
            qb.push(" AND EXISTS (SELECT 1 FROM categories c WHERE c.id = p.category_id AND c.slug = ");
            qb.push_bind(category_slug);
            qb.push(")");
        }
        if let Some(tag_slug) = filter.tag_slug {
            qb.push(
                " AND EXISTS (SELECT 1 FROM blog_post_tags bpt JOIN tags t ON t.id = bpt.tag_id \
                 WHERE bpt.blog_post_id = p.id AND t.slug = ",
            );
            qb.push_bind(tag_slug);
            qb.push(")");
        }

        if filter.published_only {
            qb.push(" ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC");
        } else {
            qb.push(" ORDER BY p.created_at DESC");
        }
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        qb.push(" OFFSET ");
        qb.push_bind(filter.skip.max(0));

        let posts = qb
            .build_query_as::<BlogPost>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_relations(posts).await
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<BlogPostWithRelations>> {
        self.load_post(id).await
    }

    async fn get_post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPostWithRelations>> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blog_posts WHERE slug = $1",
            POST_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        match post {
            Some(post) => Ok(self.attach_relations(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_post_by_slug(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> StoreResult<Option<BlogPost>> {
        Ok(sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blog_posts WHERE slug = $1 AND ($2::UUID IS NULL OR id <> $2)",
            POST_COLUMNS
        ))
        .bind(slug)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        fields: PostFields,
        tag_ids: Vec<Uuid>,
    ) -> StoreResult<BlogPostWithRelations> {
        let mut tx = self.pool.begin().await?;

        let post = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            INSERT INTO blog_posts
                (title, slug, content, excerpt, feature_image, published, published_at,
                 author_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(&fields.title)
        .bind(&fields.slug)
        .bind(&fields.content)
        .bind(&fields.excerpt)
        .bind(&fields.feature_image)
        .bind(fields.published)
        .bind(fields.published_at)
        .bind(author_id)
        .bind(fields.category_id)
        .fetch_one(&mut *tx)
        .await?;

        for tag_id in &tag_ids {
            sqlx::query(
                "INSERT INTO blog_post_tags (blog_post_id, tag_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(post.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.attach_relations(vec![post])
            .await?
            .pop()
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_post(
        &self,
        id: Uuid,
        fields: PostFields,
        tag_ids: Option<Vec<Uuid>>,
    ) -> StoreResult<Option<BlogPostWithRelations>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            UPDATE blog_posts
            SET title = $1, slug = $2, content = $3, excerpt = $4, feature_image = $5,
                published = $6, published_at = $7, category_id = $8, updated_at = now()
            WHERE id = $9
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(&fields.title)
        .bind(&fields.slug)
        .bind(&fields.content)
        .bind(&fields.excerpt)
        .bind(&fields.feature_image)
        .bind(fields.published)
        .bind(fields.published_at)
        .bind(fields.category_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(post) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(tag_ids) = tag_ids {
            sqlx::query("DELETE FROM blog_post_tags WHERE blog_post_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for tag_id in &tag_ids {
                sqlx::query(
                    "INSERT INTO blog_post_tags (blog_post_id, tag_id) VALUES ($1, $2) \
                     ON CONFLICT DO NOTHING",
                )
                .bind(id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(self.attach_relations(vec![post]).await?.pop())
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self, published: Option<bool>) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM blog_posts WHERE ($1::BOOLEAN IS NULL OR published = $1)",
        )
        .bind(published)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Companies
    // ------------------------------------------------------------------------

    async fn list_companies(&self, listing: CompanyListing) -> StoreResult<Vec<Company>> {
        let sql = match listing {
            CompanyListing::Admin => format!(
                "SELECT {} FROM companies ORDER BY created_at DESC",
                COMPANY_COLUMNS
            ),
            CompanyListing::Public => format!(
                "SELECT {} FROM companies WHERE status = '{}' \
                 ORDER BY featured DESC, sort_order ASC, created_at DESC",
                COMPANY_COLUMNS,
                CompanyStatus::Active.as_str()
            ),
        };
        Ok(sqlx::query_as::<_, Company>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_company(&self, id: Uuid) -> StoreResult<Option<Company>> {
        Ok(sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE id = $1",
            COMPANY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_company_by_slug(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> StoreResult<Option<Company>> {
        Ok(sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE slug = $1 AND ($2::UUID IS NULL OR id <> $2)",
            COMPANY_COLUMNS
        ))
        .bind(slug)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_company(&self, fields: CompanyFields) -> StoreResult<Company> {
        Ok(sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies
                (name, slug, description, industry, status, founded, website, logo, image,
                 featured, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(&fields.description)
        .bind(&fields.industry)
        .bind(fields.status.as_str())
        .bind(&fields.founded)
        .bind(&fields.website)
        .bind(&fields.logo)
        .bind(&fields.image)
        .bind(fields.featured)
        .bind(fields.sort_order)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_company(
        &self,
        id: Uuid,
        fields: CompanyFields,
    ) -> StoreResult<Option<Company>> {
        Ok(sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies
            SET name = $1, slug = $2, description = $3, industry = $4, status = $5,
                founded = $6, website = $7, logo = $8, image = $9, featured = $10,
                sort_order = $11, updated_at = now()
            WHERE id = $12
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(&fields.description)
        .bind(&fields.industry)
        .bind(fields.status.as_str())
        .bind(&fields.founded)
        .bind(&fields.website)
        .bind(&fields.logo)
        .bind(&fields.image)
        .bind(fields.featured)
        .bind(fields.sort_order)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_company(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Newsletter subscribers
    // ------------------------------------------------------------------------

    async fn list_subscribers(
        &self,
        status: Option<SubscriberStatus>,
    ) -> StoreResult<Vec<NewsletterSubscriber>> {
        Ok(sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            "SELECT {} FROM newsletter_subscribers \
             WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC",
            SUBSCRIBER_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_subscriber(&self, id: Uuid) -> StoreResult<Option<NewsletterSubscriber>> {
        Ok(sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            "SELECT {} FROM newsletter_subscribers WHERE id = $1",
            SUBSCRIBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_subscriber_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<NewsletterSubscriber>> {
        Ok(sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            "SELECT {} FROM newsletter_subscribers WHERE email = $1",
            SUBSCRIBER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_subscriber(
        &self,
        email: &str,
        name: Option<String>,
    ) -> StoreResult<NewsletterSubscriber> {
        Ok(sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            "INSERT INTO newsletter_subscribers (email, name, status) VALUES ($1, $2, $3) \
             RETURNING {}",
            SUBSCRIBER_COLUMNS
        ))
        .bind(email)
        .bind(&name)
        .bind(SubscriberStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn set_subscriber_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
    ) -> StoreResult<Option<NewsletterSubscriber>> {
        Ok(sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            "UPDATE newsletter_subscribers SET status = $1, updated_at = now() WHERE id = $2 \
             RETURNING {}",
            SUBSCRIBER_COLUMNS
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_subscriber(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM newsletter_subscribers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Email campaigns
    // ------------------------------------------------------------------------

    async fn list_campaigns(&self) -> StoreResult<Vec<EmailCampaign>> {
        Ok(sqlx::query_as::<_, EmailCampaign>(&format!(
            "SELECT {} FROM email_campaigns ORDER BY created_at DESC",
            CAMPAIGN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_campaign(&self, id: Uuid) -> StoreResult<Option<EmailCampaign>> {
        Ok(sqlx::query_as::<_, EmailCampaign>(&format!(
            "SELECT {} FROM email_campaigns WHERE id = $1",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_campaign(&self, subject: &str, content: &str) -> StoreResult<EmailCampaign> {
        Ok(sqlx::query_as::<_, EmailCampaign>(&format!(
            "INSERT INTO email_campaigns (subject, content, status) VALUES ($1, $2, $3) \
             RETURNING {}",
            CAMPAIGN_COLUMNS
        ))
        .bind(subject)
        .bind(content)
        .bind(CampaignStatus::Draft.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        fields: CampaignFields,
    ) -> StoreResult<Option<EmailCampaign>> {
        Ok(sqlx::query_as::<_, EmailCampaign>(&format!(
            "UPDATE email_campaigns SET subject = $1, content = $2, status = $3, \
             updated_at = now() WHERE id = $4 RETURNING {}",
            CAMPAIGN_COLUMNS
        ))
        .bind(&fields.subject)
        .bind(&fields.content)
        .bind(fields.status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn mark_campaign_sent(
        &self,
        id: Uuid,
        recipient_count: i32,
    ) -> StoreResult<Option<EmailCampaign>> {
        Ok(sqlx::query_as::<_, EmailCampaign>(&format!(
            "UPDATE email_campaigns SET status = $1, sent_at = now(), recipient_count = $2, \
             updated_at = now() WHERE id = $3 RETURNING {}",
            CAMPAIGN_COLUMNS
        ))
        .bind(CampaignStatus::Sent.as_str())
        .bind(recipient_count)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_campaign(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM email_campaigns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let (total_posts, published_posts, categories, tags, active_subscribers): (
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM blog_posts),
                (SELECT COUNT(*) FROM blog_posts WHERE published),
                (SELECT COUNT(*) FROM categories),
                (SELECT COUNT(*) FROM tags),
                (SELECT COUNT(*) FROM newsletter_subscribers WHERE status = 'ACTIVE')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_posts,
            published_posts,
            draft_posts: total_posts - published_posts,
            categories,
            tags,
            active_subscribers,
        })
    }
}
