//! SMTP dispatch for finished mailings.
//!
//! A single `Mailer` is built at startup from the `[mail]` section and
//! shared across requests; `lettre`'s async transport pools connections
//! internally. The HTML body passes through the same `sanitize` routine
//! the export pipeline uses, so what a recipient sees matches what an
//! exported archive contains.

use crate::config::MailConfig;
use crate::error::ServiceError;
use crate::utils::html;
use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Clone, Debug)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build the shared mailer from the `[mail]` section.
    ///
    /// Only called when `mail.host` is set; a misconfigured relay or
    /// sender address is a startup error, not a per-request one.
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        }
        .with_context(|| format!("Failed to configure SMTP relay '{}'", config.host))?
        .port(config.port);

        if let Some(username) = &config.username
            && let Some(password) = &config.password
        {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid mail.from address '{}'", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Sanitize and dispatch one HTML mailing.
    ///
    /// Returns the relay's response summary, e.g. `250 2.0.0 OK`.
    pub async fn send(
        &self,
        to: &str,
        reply_to: Option<&str>,
        subject: &str,
        body: &str,
    ) -> Result<String, ServiceError> {
        let to_mailbox: Mailbox = to.parse().map_err(|err| {
            ServiceError::Validation(format!("invalid recipient address `{to}`: {err}"))
        })?;

        let mut message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject);

        if let Some(reply_to) = reply_to {
            let mailbox: Mailbox = reply_to.parse().map_err(|err| {
                ServiceError::Validation(format!("invalid reply-to address `{reply_to}`: {err}"))
            })?;
            message = message.reply_to(mailbox);
        }

        let message = message
            .header(ContentType::TEXT_HTML)
            .body(html::sanitize(body).into_owned())
            .map_err(|err| ServiceError::MailDelivery(err.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|err| ServiceError::MailDelivery(err.to_string()))?;

        Ok(format!(
            "{} {}",
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
