//! Mail transports behind the contact form.

use async_trait::async_trait;
use reqwest::{Client, Url, header::AUTHORIZATION};
use serde::Serialize;
use tracing::{debug, info};

use crate::application::contact::{MailError, Mailer, OutgoingMail};
use crate::config::MailTransport;

use super::error::InfraError;

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
struct MailPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: &'a str,
    text: &'a str,
}

/// Posts each message as JSON to a transactional-mail HTTP API.
#[derive(Clone, Debug)]
pub struct HttpMailer {
    client: Client,
    endpoint: Url,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(transport: &MailTransport) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("sylheti-archive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::configuration(format!("mail client: {err}")))?;
        Ok(Self {
            client,
            endpoint: transport.api_url.clone(),
            api_key: transport.api_key.clone(),
            from: transport.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let payload = MailPayload {
            from: &self.from,
            to: [mail.to.as_str()],
            reply_to: mail.reply_to.as_deref(),
            subject: &mail.subject,
            text: &mail.text,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(
                target = "sylheti_archive::mail",
                status = status.as_u16(),
                body = %body,
                "mail API rejected message"
            );
            return Err(MailError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Records messages in the log instead of delivering them.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        info!(
            target = "sylheti_archive::mail",
            to = %mail.to,
            subject = %mail.subject,
            "mail transport not configured; message logged only"
        );
        Ok(())
    }
}
