use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use super::{EmailMessage, MailClient, MailError};

pub struct SmtpMailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl SmtpMailClient {
    pub fn from_env() -> Result<Self, MailError> {
        let host = std::env::var("SMTP_HOST")
            .map_err(|_| MailError::Config("SMTP_HOST not set".into()))?;
        let port: u16 = std::env::var("SMTP_PORT")
            .map_err(|_| MailError::Config("SMTP_PORT not set".into()))?
            .parse()
            .map_err(|_| MailError::Config("Invalid SMTP port".into()))?;
        let username = std::env::var("SMTP_USERNAME")
            .map_err(|_| MailError::Config("SMTP_USERNAME not set".into()))?;
        let password = std::env::var("SMTP_PASSWORD")
            .map_err(|_| MailError::Config("SMTP_PASSWORD not set".into()))?;
        let from_email = std::env::var("MAIL_FROM_EMAIL")
            .map_err(|_| MailError::Config("MAIL_FROM_EMAIL not set".into()))?;
        let from_name =
            std::env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Sanara".to_string());

        let creds = Credentials::new(username, password);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .map_err(|e| MailError::Config(format!("Failed to create SMTP transport: {}", e)))?
            .port(port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_email,
            from_name,
        })
    }
}

#[async_trait::async_trait]
impl MailClient for SmtpMailClient {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let from_address = format!("{} <{}>", self.from_name, self.from_email);

        let email_builder = Message::builder()
            .from(
                from_address
                    .parse()
                    .map_err(|e| MailError::Address(format!("from: {}", e)))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| MailError::Address(format!("to: {}", e)))?)
            .subject(&message.subject);

        let email = match (&message.body_html, &message.body_text) {
            (Some(html), Some(text)) => email_builder
                .multipart(
                    MultiPart::alternative()
                        .singlepart(
                            SinglePart::builder()
                                .header(ContentType::TEXT_PLAIN)
                                .body(text.clone()),
                        )
                        .singlepart(
                            SinglePart::builder()
                                .header(ContentType::TEXT_HTML)
                                .body(html.clone()),
                        ),
                )
                .map_err(|e| MailError::Build(e.to_string()))?,
            (Some(html), None) => email_builder
                .header(ContentType::TEXT_HTML)
                .body(html.clone())
                .map_err(|e| MailError::Build(e.to_string()))?,
            (None, Some(text)) => email_builder
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone())
                .map_err(|e| MailError::Build(e.to_string()))?,
            (None, None) => {
                return Err(MailError::Build(
                    "Email must have either HTML or text body".into(),
                ));
            }
        };

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}
