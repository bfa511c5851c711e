//! Database seeding.
//!
//! ```text
//! seed                         admin user, `general` category, `announcement` tag
//! seed --companies             the above plus sample portfolio companies
//! seed hash-password <PASS>    print a bcrypt hash for ADMIN_HASH_PASSWORD
//! ```

use anyhow::{bail, Context};
use bcrypt::{hash, DEFAULT_COST};
use std::env;

use portfolio_cms::config::AppConfig;
use portfolio_cms::db::models::{CategoryFields, CompanyFields, CompanyStatus, TagFields};
use portfolio_cms::db::{self, postgres::PgStore, DbConfig, Store};
use portfolio_cms::logging;
use portfolio_cms::routes::auth::bootstrap_admin;

struct SampleCompany {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    industry: &'static str,
    status: CompanyStatus,
    founded: &'static str,
    website: Option<&'static str>,
    featured: bool,
}

const SAMPLE_COMPANIES: &[SampleCompany] = &[
    SampleCompany {
        name: "TechFlow Solutions",
        slug: "techflow-solutions",
        description: "Workflow automation platform for operations teams.",
        industry: "SaaS",
        status: CompanyStatus::Active,
        founded: "2022",
        website: Some("https://techflow.example.com"),
        featured: true,
    },
    SampleCompany {
        name: "HealthBridge Analytics",
        slug: "healthbridge-analytics",
        description: "Healthcare analytics with predictive dashboards for clinicians.",
        industry: "HealthTech",
        status: CompanyStatus::Active,
        founded: "2021",
        website: Some("https://healthbridge.example.com"),
        featured: true,
    },
    SampleCompany {
        name: "GreenEnergy Ventures",
        slug: "greenenergy-ventures",
        description: "Solar and wind installations with smart grid integration.",
        industry: "CleanTech",
        status: CompanyStatus::Active,
        founded: "2020",
        website: Some("https://greenenergy.example.com"),
        featured: false,
    },
    SampleCompany {
        name: "FinanceFirst",
        slug: "financefirst",
        description: "Digital banking for underserved communities, later acquired.",
        industry: "FinTech",
        status: CompanyStatus::Acquired,
        founded: "2018",
        website: None,
        featured: false,
    },
];

fn print_hash(password: &str) -> anyhow::Result<()> {
    let hashed = hash(password, DEFAULT_COST).context("failed to hash password")?;
    println!("Cost     : {}", DEFAULT_COST);
    println!("Hash     : {}\n", hashed);
    println!("# Paste this into your .env:");
    println!("ADMIN_HASH_PASSWORD={}", hashed);
    Ok(())
}

async fn seed_taxonomy(store: &dyn Store) -> anyhow::Result<()> {
    if store.find_category_by_slug("general", None).await?.is_none() {
        store
            .create_category(CategoryFields {
                name: "General".to_string(),
                slug: "general".to_string(),
                description: Some("General posts and updates".to_string()),
            })
            .await?;
        tracing::info!("Created category general");
    }
    if store.find_tag_by_slug("announcement", None).await?.is_none() {
        store
            .create_tag(TagFields {
                name: "Announcement".to_string(),
                slug: "announcement".to_string(),
            })
            .await?;
        tracing::info!("Created tag announcement");
    }
    Ok(())
}

async fn seed_companies(store: &dyn Store) -> anyhow::Result<()> {
    for (index, company) in SAMPLE_COMPANIES.iter().enumerate() {
        if store.find_company_by_slug(company.slug, None).await?.is_some() {
            continue;
        }
        store
            .create_company(CompanyFields {
                name: company.name.to_string(),
                slug: company.slug.to_string(),
                description: Some(company.description.to_string()),
                industry: Some(company.industry.to_string()),
                status: company.status,
                founded: Some(company.founded.to_string()),
                website: company.website.map(str::to_string),
                logo: None,
                image: None,
                featured: company.featured,
                sort_order: index as i32 + 1,
            })
            .await?;
        tracing::info!("Created company {}", company.slug);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("hash-password") {
        let Some(password) = args.get(1) else {
            bail!("Usage: seed hash-password <PASSWORD>");
        };
        return print_hash(password);
    }
    let with_companies = args.iter().any(|a| a == "--companies");

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();
    let _log_guards = logging::init(config.is_production());

    let Some(url) = config.database_url.clone() else {
        bail!("DATABASE_URL must be set to seed the database");
    };
    let Some(admin) = config.admin.as_ref() else {
        bail!("ADMIN_EMAIL and ADMIN_PASSWORD (or ADMIN_HASH_PASSWORD) must be set");
    };

    let pool = db::init_pool(&DbConfig::from_env(url)).await?;
    db::run_migrations(&pool).await?;
    let store = PgStore::new(pool);

    match bootstrap_admin(&store, admin).await? {
        Some(user) => tracing::info!("Admin user {} created", user.email),
        None => tracing::info!("Admin user already exists, skipping"),
    }
    seed_taxonomy(&store).await?;
    if with_companies {
        seed_companies(&store).await?;
    }

    tracing::info!("Seeding completed");
    Ok(())
}
