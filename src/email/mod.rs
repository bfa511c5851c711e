//! Outbound email: provider clients and the newsletter templates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::{Context, Tera};
use thiserror::Error;

use crate::config::{EmailConfig, SiteConfig};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

const WELCOME_TEMPLATE: &str = "welcome.html";
const NEWSLETTER_TEMPLATE: &str = "newsletter.html";

/// Resend accepts at most 50 addresses per recipient field.
pub const MAX_RECIPIENTS_PER_MESSAGE: usize = 50;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("email transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email provider rejected the message ({status}): {body}")]
    Provider { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Provider-assigned id of an accepted message.
pub type MessageId = String;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<MessageId, EmailError>;
}

// ============================================================================
// Providers
// ============================================================================

/// Resend HTTP API client.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<MessageId, EmailError> {
        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let accepted: ResendResponse = response.json().await?;
        Ok(accepted.id)
    }
}

/// Used when no provider key is configured: the message is only logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<MessageId, EmailError> {
        tracing::info!(
            to = email.to.len(),
            bcc = email.bcc.len(),
            subject = %email.subject,
            "RESEND_API_KEY not set; email not delivered"
        );
        Ok(format!("log-{}", uuid::Uuid::new_v4()))
    }
}

pub fn mailer_from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key.clone())),
        None => {
            tracing::warn!("RESEND_API_KEY not set. Outgoing email will only be logged.");
            Arc::new(LogMailer)
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

fn load_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (
            WELCOME_TEMPLATE,
            include_str!("../../templates/email/welcome.html"),
        ),
        (
            NEWSLETTER_TEMPLATE,
            include_str!("../../templates/email/newsletter.html"),
        ),
    ])?;
    Ok(tera)
}

/// Campaign bodies are stored as sanitized HTML or plain text; newlines become
/// explicit breaks.
fn campaign_body(content: &str) -> String {
    ammonia::clean(content).replace("\r\n", "\n").replace('\n', "<br />")
}

/// Renders the templates and hands messages to the configured [`Mailer`].
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    templates: Tera,
    site: SiteConfig,
    from: String,
}

impl EmailService {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        site: SiteConfig,
        from: String,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            mailer,
            templates: load_templates()?,
            site,
            from,
        })
    }

    fn unsubscribe_url(&self, recipient: Option<&str>) -> String {
        let base = format!("{}/api/newsletter/unsubscribe", self.site.url);
        match recipient {
            Some(email) => reqwest::Url::parse_with_params(&base, &[("email", email)])
                .map(|url| url.to_string())
                .unwrap_or(base),
            None => format!("{}/newsletter", self.site.url),
        }
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site_name", &self.site.name);
        context.insert("site_url", &self.site.url);
        context.insert("author", &self.site.author);
        context
    }

    pub fn render_welcome(&self, email: &str, name: Option<&str>) -> Result<String, EmailError> {
        let mut context = self.base_context();
        context.insert("name", name.filter(|n| !n.trim().is_empty()).unwrap_or("there"));
        context.insert("blog_url", &format!("{}/blog", self.site.url));
        context.insert("unsubscribe_url", &self.unsubscribe_url(Some(email)));
        Ok(self.templates.render(WELCOME_TEMPLATE, &context)?)
    }

    pub fn render_newsletter(
        &self,
        subject: &str,
        content: &str,
        recipient: Option<&str>,
    ) -> Result<String, EmailError> {
        let mut context = self.base_context();
        context.insert("subject", subject);
        context.insert("tagline", &self.site.description);
        context.insert("content", &campaign_body(content));
        context.insert("unsubscribe_url", &self.unsubscribe_url(recipient));
        Ok(self.templates.render(NEWSLETTER_TEMPLATE, &context)?)
    }

    pub async fn send_welcome_email(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<MessageId, EmailError> {
        let html = self.render_welcome(email, name)?;
        self.mailer
            .send(OutgoingEmail {
                from: self.from.clone(),
                to: vec![email.to_string()],
                bcc: Vec::new(),
                subject: format!("Welcome to the {} newsletter!", self.site.name),
                html,
            })
            .await
    }

    /// Sends one campaign to every recipient.
    ///
    /// A lone recipient is addressed directly and gets a personal unsubscribe
    /// link. Larger lists go out as blind copies addressed to the sender, in
    /// batches the provider accepts. Stops at the first rejected batch.
    pub async fn send_newsletter_campaign(
        &self,
        recipients: Vec<String>,
        subject: &str,
        content: &str,
    ) -> Result<Vec<MessageId>, EmailError> {
        if let [only] = recipients.as_slice() {
            let html = self.render_newsletter(subject, content, Some(only.as_str()))?;
            let id = self
                .mailer
                .send(OutgoingEmail {
                    from: self.from.clone(),
                    to: vec![only.clone()],
                    bcc: Vec::new(),
                    subject: subject.to_string(),
                    html,
                })
                .await?;
            return Ok(vec![id]);
        }

        let html = self.render_newsletter(subject, content, None)?;
        let mut ids = Vec::new();
        for batch in recipients.chunks(MAX_RECIPIENTS_PER_MESSAGE) {
            let id = self
                .mailer
                .send(OutgoingEmail {
                    from: self.from.clone(),
                    to: vec![self.from.clone()],
                    bcc: batch.to_vec(),
                    subject: subject.to_string(),
                    html: html.clone(),
                })
                .await
                .inspect_err(|e| {
                    tracing::error!(
                        error = %e,
                        delivered_batches = ids.len(),
                        "Newsletter batch rejected"
                    )
                })?;
            ids.push(id);
        }
        Ok(ids)
    }

    pub async fn send_test_email(
        &self,
        email: &str,
        subject: &str,
        content: &str,
    ) -> Result<MessageId, EmailError> {
        let html = self.render_newsletter(subject, content, Some(email))?;
        self.mailer
            .send(OutgoingEmail {
                from: self.from.clone(),
                to: vec![email.to_string()],
                bcc: Vec::new(),
                subject: format!("[TEST] {}", subject),
                html,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingMailer;

    fn service(mailer: Arc<RecordingMailer>) -> EmailService {
        let site = SiteConfig {
            url: "https://example.com".to_string(),
            name: "Example".to_string(),
            ..SiteConfig::default()
        };
        EmailService::new(mailer, site, "News <news@example.com>".to_string()).unwrap()
    }

    #[test]
    fn test_campaign_body_converts_newlines_and_strips_scripts() {
        let body = campaign_body("line one\nline two<script>alert(1)</script>");
        assert!(body.contains("line one<br />line two"));
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn test_welcome_greets_there_without_name() {
        let svc = service(Arc::new(RecordingMailer::default()));
        let html = svc.render_welcome("a@example.com", None).unwrap();
        assert!(html.contains("Hi there,"));
        let html = svc.render_welcome("a@example.com", Some("Ada")).unwrap();
        assert!(html.contains("Hi Ada,"));
    }

    #[test]
    fn test_newsletter_links_personal_unsubscribe() {
        let svc = service(Arc::new(RecordingMailer::default()));
        let html = svc
            .render_newsletter("Hello", "Body", Some("a+b@example.com"))
            .unwrap();
        assert!(html.contains("unsubscribe?email=a%2Bb%40example.com"));
        assert!(html.contains("Hello"));
    }

    #[tokio::test]
    async fn test_test_email_prefixes_subject() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(mailer.clone());
        svc.send_test_email("me@example.com", "Launch", "Hi")
            .await
            .unwrap();
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "[TEST] Launch");
        assert_eq!(sent[0].to, vec!["me@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_campaign_hides_recipients_in_bcc() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(mailer.clone());
        svc.send_newsletter_campaign(
            vec!["a@example.com".to_string(), "b@example.com".to_string()],
            "Monthly",
            "News",
        )
        .await
        .unwrap();
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["News <news@example.com>".to_string()]);
        assert_eq!(sent[0].bcc.len(), 2);
        assert!(sent[0].html.contains("example.com&#x2F;newsletter"));
    }

    #[tokio::test]
    async fn test_large_campaign_is_split_into_provider_batches() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(mailer.clone());
        let recipients: Vec<String> = (0..120).map(|i| format!("r{i}@example.com")).collect();
        let ids = svc
            .send_newsletter_campaign(recipients, "Monthly", "News")
            .await
            .unwrap();
        assert_eq!(ids.len(), 3);

        let sizes: Vec<usize> = mailer.sent().iter().map(|m| m.bcc.len()).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert!(sizes.iter().all(|&n| n <= MAX_RECIPIENTS_PER_MESSAGE));
    }

    #[tokio::test]
    async fn test_single_recipient_campaign_is_addressed_directly() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(mailer.clone());
        svc.send_newsletter_campaign(vec!["solo@example.com".to_string()], "Monthly", "News")
            .await
            .unwrap();
        let sent = mailer.sent();
        assert_eq!(sent[0].to, vec!["solo@example.com".to_string()]);
        assert!(sent[0].bcc.is_empty());
        assert!(sent[0].html.contains("unsubscribe?email=solo%40example.com"));
    }
}
