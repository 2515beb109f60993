use std::sync::Arc;

mod smtp;
pub mod templates;

pub use smtp::SmtpMailClient;

#[derive(Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_html: Option<String>,
    pub body_text: Option<String>,
}

#[async_trait::async_trait]
pub trait MailClient: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

pub type DynMailClient = Arc<dyn MailClient>;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail configuration error: {0}")]
    Config(String),
    #[error("invalid address: {0}")]
    Address(String),
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("failed to send email: {0}")]
    Transport(String),
}

/// Builds the SMTP client from `SMTP_HOST`/`SMTP_PORT`/`SMTP_USERNAME`/
/// `SMTP_PASSWORD`/`MAIL_FROM_EMAIL`/`MAIL_FROM_NAME`. Returns None when the
/// host is not configured so the service runs without outbound mail.
pub fn create_mail_client() -> Option<DynMailClient> {
    if std::env::var("SMTP_HOST").is_err() {
        tracing::info!("SMTP_HOST not set, outbound mail disabled");
        return None;
    }
    match SmtpMailClient::from_env() {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!("Failed to initialize mail client: {}", e);
            None
        }
    }
}
