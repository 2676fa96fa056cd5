//! Contact form: an admin notification plus an auto-reply to the sender.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::application::auth::normalize_email;

const MAX_MESSAGE_CHARS: usize = 5_000;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("mail service rejected the message with status {status}")]
    Rejected { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Debug, Clone)]
pub struct ContactCommand {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Clone)]
pub struct ContactService {
    mailer: Arc<dyn Mailer>,
    admin_address: String,
}

impl ContactService {
    pub fn new(mailer: Arc<dyn Mailer>, admin_address: String) -> Self {
        Self {
            mailer,
            admin_address,
        }
    }

    pub async fn submit(&self, command: ContactCommand) -> Result<(), ContactError> {
        let name = command.name.trim();
        if name.is_empty() {
            return Err(ContactError::ConstraintViolation("name"));
        }
        let email =
            normalize_email(&command.email).map_err(|_| ContactError::ConstraintViolation("email"))?;
        let message = command.message.trim();
        if message.is_empty() || message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ContactError::ConstraintViolation("message"));
        }
        let subject = command
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|subject| !subject.is_empty())
            .unwrap_or("New message");

        let notification = OutgoingMail {
            to: self.admin_address.clone(),
            reply_to: Some(email.clone()),
            subject: format!("[Contact] {subject}"),
            text: format!("From: {name} <{email}>\n\n{message}"),
        };
        let reply = OutgoingMail {
            to: email.clone(),
            reply_to: None,
            subject: "Thank you for contacting The Sylheti Archive".to_string(),
            text: format!(
                "Dear {name},\n\nWe have received your message and will reply soon.\n\n> {}\n",
                message.replace('\n', "\n> ")
            ),
        };

        self.mailer.send(&notification).await?;
        self.mailer.send(&reply).await?;

        info!(
            target = "sylheti_archive::contact",
            subject,
            "contact message delivered"
        );
        Ok(())
    }
}
