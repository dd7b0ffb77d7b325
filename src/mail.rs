//! Agent notification emails.
//!
//! Dispatch is fire-and-forget: a failed send is logged and dropped,
//! never surfaced to the webhook caller.

use crate::config::Config;
use crate::i18n::MessageCatalog;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[derive(Debug, Clone)]
pub struct OutboundMail {
    pub from_name: String,
    pub from_address: String,
    pub to_name: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<()>;
}

/// Transport against the SendGrid v3 send endpoint.
pub struct SendGridTransport {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl SendGridTransport {
    pub fn new(api_base: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl MailTransport for SendGridTransport {
    async fn send(&self, mail: &OutboundMail) -> Result<()> {
        let body = serde_json::json!({
            "personalizations": [{
                "to": [{ "email": mail.to_address, "name": mail.to_name }],
            }],
            "from": { "email": mail.from_address, "name": mail.from_name },
            "subject": mail.subject,
            "content": [{ "type": "text/plain", "value": mail.body }],
        });

        let response = self
            .http
            .post(format!("{}/v3/mail/send", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("error sending email")?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("mail API responded with {}: {}", status, text);
        }
        Ok(())
    }
}

/// Builds localized notification emails and hands them to the transport.
pub struct Mailer {
    config: Arc<Config>,
    catalog: Arc<MessageCatalog>,
    transport: Box<dyn MailTransport>,
}

impl Mailer {
    pub fn new(
        config: Arc<Config>,
        catalog: Arc<MessageCatalog>,
        transport: Box<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            catalog,
            transport,
        }
    }

    /// Notifies agents that a client called but did not leave a voicemail.
    pub async fn missed_call(&self, lang: &str, from_did: &str) {
        let subject = self.catalog.message_replace(
            lang,
            |m| &m.email.missed_call_subject,
            &[("phoneNumber", from_did)],
        );
        let body = self.catalog.message_replace(
            lang,
            |m| &m.email.missed_call_content,
            &[("phoneNumber", from_did)],
        );
        self.dispatch(subject, body).await;
    }

    /// Notifies agents that a client left a voicemail, linking to this
    /// service's recording redirect.
    pub async fn voicemail(&self, lang: &str, from_did: &str, recording_sid: &str) {
        let voicemail_url = format!(
            "{}/recordings/{}",
            self.config.mail.recordings_base_url, recording_sid
        );
        let subject = self.catalog.message_replace(
            lang,
            |m| &m.email.voicemail_subject,
            &[("phoneNumber", from_did)],
        );
        let body = self.catalog.message_replace(
            lang,
            |m| &m.email.voicemail_content,
            &[
                ("phoneNumber", from_did),
                ("voicemailURL", voicemail_url.as_str()),
            ],
        );
        self.dispatch(subject, body).await;
    }

    /// Forwards an inbound text message to the agents.
    pub async fn text_message(&self, lang: &str, from_did: &str, message_body: &str) {
        let subject = self.catalog.message_replace(
            lang,
            |m| &m.email.sms_subject,
            &[("phoneNumber", from_did)],
        );
        let body = self.catalog.message_replace(
            lang,
            |m| &m.email.sms_content,
            &[("phoneNumber", from_did), ("messageBody", message_body)],
        );
        self.dispatch(subject, body).await;
    }

    async fn dispatch(&self, subject: String, body: String) {
        let mail = OutboundMail {
            from_name: self.config.mail.from.name.clone(),
            from_address: self.config.mail.from.address.clone(),
            to_name: self.config.mail.to.name.clone(),
            to_address: self.config.mail.to.address.clone(),
            subject,
            body,
        };
        if let Err(e) = self.transport.send(&mail).await {
            error!("error sending email: {:?}", e);
        }
    }
}
