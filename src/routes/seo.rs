/**
 * SEO Routes
 * Sitemap, robots.txt, the RSS feed and schema.org structured data
 */
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::SiteConfig;
use crate::db::models::{BlogPostWithRelations, CompanyListing, PostFilter};
use crate::error::ApiResult;
use crate::state::AppState;

const RSS_ITEM_LIMIT: i64 = 50;

/// Pages the sitemap always lists: path, change frequency, priority.
const STATIC_PAGES: &[(&str, &str, &str)] = &[
    ("", "monthly", "1.0"),
    ("/about", "monthly", "0.8"),
    ("/companies", "weekly", "0.8"),
    ("/blog", "daily", "0.9"),
    ("/contact", "monthly", "0.7"),
    ("/newsletter", "monthly", "0.6"),
];

const ROBOTS_DISALLOW: &[&str] = &["/admin/", "/api/", "/_next/", "/private/"];

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

fn absolute(site: &SiteConfig, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", site.url, path)
    }
}

fn xml_response(content_type: &'static str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600, stale-while-revalidate=600",
            ),
        ],
        body,
    )
        .into_response()
}

// ============================================================================
// Page metadata
// ============================================================================

/// Metadata a page renders into its head: title, description, canonical URL and
/// share image, all resolved against the site configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub image: String,
    pub site_name: String,
    pub kind: &'static str,
    pub twitter_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
}

impl PageMetadata {
    pub fn new(
        site: &SiteConfig,
        title: Option<&str>,
        description: Option<&str>,
        path: &str,
        image: Option<&str>,
    ) -> Self {
        let title = match title {
            Some(t) if t.contains(&site.name) => t.to_string(),
            Some(t) => format!("{} | {}", t, site.name),
            None => format!("{} - {}", site.name, site.job_title),
        };
        Self {
            title,
            description: description.unwrap_or(&site.description).to_string(),
            canonical: absolute(site, path),
            image: absolute(site, image.unwrap_or(&site.default_image)),
            site_name: site.name.clone(),
            kind: "website",
            twitter_handle: Some(site.twitter_handle.clone()).filter(|h| !h.is_empty()),
            published_time: None,
            modified_time: None,
        }
    }

    pub fn for_post(site: &SiteConfig, post: &BlogPostWithRelations) -> Self {
        let p = &post.post;
        Self {
            kind: "article",
            published_time: p.published_at,
            modified_time: Some(p.updated_at),
            ..Self::new(
                site,
                Some(&p.title),
                p.excerpt.as_deref(),
                &format!("/blog/{}", p.slug),
                p.feature_image.as_deref(),
            )
        }
    }
}

// ============================================================================
// Structured data
// ============================================================================

pub fn person_json_ld(site: &SiteConfig) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "Person",
        "name": site.author,
        "jobTitle": site.job_title,
        "description": site.description,
        "url": site.url,
        "image": absolute(site, &site.default_image),
        "sameAs": site.social_links,
        "worksFor": {
            "@type": "Organization",
            "name": site.name,
        },
    })
}

pub fn organization_json_ld(site: &SiteConfig) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "Organization",
        "name": site.name,
        "url": site.url,
        "logo": absolute(site, "/logo.png"),
        "description": site.description,
        "founder": {
            "@type": "Person",
            "name": site.author,
        },
        "sameAs": site.social_links,
    })
}

pub fn article_json_ld(site: &SiteConfig, post: &BlogPostWithRelations) -> Value {
    let p = &post.post;
    let author = post
        .author
        .as_ref()
        .map(|a| a.name.as_str())
        .unwrap_or(&site.author);

    let mut article = json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": p.title,
        "description": p.excerpt.as_deref().unwrap_or(&site.description),
        "url": absolute(site, &format!("/blog/{}", p.slug)),
        "image": absolute(site, p.feature_image.as_deref().unwrap_or(&site.default_image)),
        "datePublished": p.published_at.unwrap_or(p.created_at),
        "dateModified": p.updated_at,
        "author": {
            "@type": "Person",
            "name": author,
            "url": site.url,
        },
        "publisher": {
            "@type": "Organization",
            "name": site.name,
            "logo": {
                "@type": "ImageObject",
                "url": absolute(site, "/logo.png"),
            },
        },
    });
    if let Some(category) = &post.category {
        article["articleSection"] = json!(category.name);
    }
    if !post.tags.is_empty() {
        let keywords: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
        article["keywords"] = json!(keywords.join(", "));
    }
    article
}

/// `items` are (name, site-relative path) pairs in order.
pub fn breadcrumb_json_ld(site: &SiteConfig, items: &[(&str, &str)]) -> Value {
    let elements: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(index, (name, path))| {
            json!({
                "@type": "ListItem",
                "position": index + 1,
                "name": name,
                "item": absolute(site, path),
            })
        })
        .collect();
    json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": elements,
    })
}

// ============================================================================
// Documents
// ============================================================================

fn sitemap_entry(loc: &str, lastmod: &DateTime<Utc>, changefreq: &str, priority: &str) -> String {
    format!(
        "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
        escape_xml(loc),
        lastmod.to_rfc3339(),
        changefreq,
        priority,
    )
}

/// GET /sitemap.xml
pub async fn sitemap(State(state): State<AppState>) -> ApiResult<Response> {
    let site = &state.config.site;
    let now = Utc::now();
    let posts = state.store.list_posts(PostFilter::published()).await?;
    let companies = state.store.list_companies(CompanyListing::Public).await?;

    let mut urls = String::new();
    for (path, changefreq, priority) in STATIC_PAGES {
        urls.push_str(&sitemap_entry(&absolute(site, path), &now, changefreq, priority));
    }
    for post in &posts {
        let loc = absolute(site, &format!("/blog/{}", post.post.slug));
        urls.push_str(&sitemap_entry(&loc, &post.post.updated_at, "weekly", "0.7"));
    }
    for company in &companies {
        let loc = absolute(site, &format!("/companies/{}", company.slug));
        urls.push_str(&sitemap_entry(&loc, &company.updated_at, "monthly", "0.6"));
    }

    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>\n",
        urls
    );
    Ok(xml_response("application/xml; charset=utf-8", xml))
}

/// GET /robots.txt
pub async fn robots(State(state): State<AppState>) -> Response {
    let mut body = String::from("User-agent: *\nAllow: /\n");
    for path in ROBOTS_DISALLOW {
        body.push_str(&format!("Disallow: {}\n", path));
    }
    body.push_str(&format!(
        "\nSitemap: {}\n",
        absolute(&state.config.site, "/sitemap.xml")
    ));
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// GET /rss.xml - the latest published posts
pub async fn rss_feed(State(state): State<AppState>) -> ApiResult<Response> {
    let site = &state.config.site;
    let posts = state
        .store
        .list_posts(PostFilter {
            limit: Some(RSS_ITEM_LIMIT),
            ..PostFilter::published()
        })
        .await?;

    let mut items = String::new();
    for post in &posts {
        let p = &post.post;
        let post_url = absolute(site, &format!("/blog/{}", p.slug));
        let mut categories = String::new();
        if let Some(category) = &post.category {
            categories.push_str(&format!(
                "      <category>{}</category>\n",
                escape_xml(&category.name)
            ));
        }
        items.push_str(&format!(
            "    <item>\n\
                   <title>{}</title>\n\
                   <link>{}</link>\n\
                   <description>{}</description>\n\
                   <pubDate>{}</pubDate>\n\
                   <guid isPermaLink=\"true\">{}</guid>\n\
             {}    </item>\n",
            escape_xml(&p.title),
            escape_xml(&post_url),
            escape_xml(p.excerpt.as_deref().unwrap_or("")),
            rfc822(&p.published_at.unwrap_or(p.created_at)),
            escape_xml(&post_url),
            categories,
        ));
    }

    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>en-us</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
    <lastBuildDate>{}</lastBuildDate>
{}  </channel>
</rss>"#,
        escape_xml(&site.name),
        escape_xml(&absolute(site, "/blog")),
        escape_xml(&site.description),
        escape_xml(&absolute(site, "/rss.xml")),
        posts
            .first()
            .map(|p| rfc822(&p.post.published_at.unwrap_or(p.post.created_at)))
            .unwrap_or_default(),
        items,
    );
    Ok(xml_response("application/rss+xml; charset=utf-8", xml))
}

/// GET /api/seo/person
pub async fn person(State(state): State<AppState>) -> Json<Value> {
    Json(person_json_ld(&state.config.site))
}

/// GET /api/seo/organization
pub async fn organization(State(state): State<AppState>) -> Json<Value> {
    Json(organization_json_ld(&state.config.site))
}
