//! Outgoing email. `AppState` carries an `Arc<dyn Mailer>`: SMTP when
//! configured, otherwise a mailer that only logs.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::{error, info};

use crate::config::SmtpConfig;

pub mod otp;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{0}'")]
    Address(String),

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("mail task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Sends the mail on a background task and logs the outcome.
pub fn dispatch(mailer: Arc<dyn Mailer>, mail: OutgoingMail) {
    tokio::spawn(async move {
        let to = mail.to_email.clone();
        match mailer.send(mail).await {
            Ok(()) => info!("Email sent to {to}"),
            Err(e) => error!("Could not send email to {to}: {e}"),
        }
    });
}

pub struct SmtpMailer {
    config: SmtpConfig,
    site_name: String,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig, site_name: String) -> Self {
        Self { config, site_name }
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let from = mailbox(&self.site_name, &self.config.from_email)?;
        let to = mailbox(&mail.to_name, &mail.to_email)?;
        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(mail.subject.clone());

        let message = match &mail.html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                mail.text_body.clone(),
                html.clone(),
            ))?,
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(mail.text_body.clone())?,
        };
        Ok(message)
    }
}

/// Display names are quoted by lettre, so any username is a valid mailbox.
fn mailbox(name: &str, email: &str) -> Result<Mailbox, MailError> {
    let address: Address = email
        .trim()
        .parse()
        .map_err(|_| MailError::Address(email.to_string()))?;
    let name = name.trim();
    Ok(Mailbox::new((!name.is_empty()).then(|| name.to_string()), address))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = self.build_message(&mail)?;
        let creds = Credentials::new(self.config.user.clone(), self.config.password.clone());
        let transport = SmtpTransport::relay(&self.config.host)?
            .credentials(creds)
            .build();

        tokio::task::spawn_blocking(move || transport.send(&message)).await??;
        Ok(())
    }
}

/// Development mailer: writes the plain-text body to the log instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(
            to = %mail.to_email,
            subject = %mail.subject,
            "SMTP not configured; mail body follows\n{}",
            mail.text_body
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutgoingMail {
        OutgoingMail {
            to_name: "Asha".to_string(),
            to_email: "asha@example.com".to_string(),
            subject: "Hello".to_string(),
            text_body: "Plain".to_string(),
            html_body: Some("<p>Rich</p>".to_string()),
        }
    }

    fn smtp_mailer() -> SmtpMailer {
        SmtpMailer::new(
            SmtpConfig {
                host: "smtp.example.com".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
                from_email: "noreply@example.com".to_string(),
            },
            "Omeiat Jobs".to_string(),
        )
    }

    #[test]
    fn test_build_message_ok() {
        assert!(smtp_mailer().build_message(&sample()).is_ok());
    }

    #[test]
    fn test_display_name_with_punctuation_is_quoted() {
        let mut mail = sample();
        mail.to_name = "Doe, John <\"JD\">".to_string();
        let message = smtp_mailer().build_message(&mail).unwrap();
        let to = message.headers().get_raw("To").unwrap().to_string();
        assert!(to.contains("<asha@example.com>"));
    }

    #[test]
    fn test_html_mail_keeps_plain_text_part() {
        let formatted = String::from_utf8(smtp_mailer().build_message(&sample()).unwrap().formatted()).unwrap();
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("Plain"));
        assert!(formatted.contains("<p>Rich</p>"));
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let mailer = SmtpMailer::new(
            SmtpConfig {
                host: "smtp.example.com".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
                from_email: "not-an-address".to_string(),
            },
            "Omeiat Jobs".to_string(),
        );
        assert!(matches!(
            mailer.build_message(&sample()),
            Err(MailError::Address(_))
        ));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        assert!(LogMailer.send(sample()).await.is_ok());
    }
}
