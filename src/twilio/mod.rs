//! Vendor REST API access and call-metadata reconstruction.
//!
//! The vendor keeps the only durable record of a call: the ordered list
//! of webhook requests it made while driving the flow. Everything we
//! need to know after a call ends (was it answered, which language the
//! caller picked, did they leave a voicemail) is re-derived from that
//! list on demand; nothing is cached locally.

use crate::config::TwilioConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, warn};
use url::Url;

mod resources;
pub use resources::{CallEvent, CallEventParameters, CallEventRequest, ListCallEventsResponse};

#[cfg(test)]
mod tests;

/// Derived summary of a call's history. Zero-valued when the history
/// could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMetadata {
    pub connected: bool,
    pub lang: String,
    pub voicemail_recording_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallEventsClient: Send + Sync {
    /// Returns the call's webhook requests in chronological order.
    async fn list_call_events(&self, call_sid: &str) -> Result<Vec<CallEventRequest>>;
}

/// Production client against the vendor's REST API.
pub struct RestClient {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
}

impl RestClient {
    pub fn new(config: &TwilioConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl CallEventsClient for RestClient {
    async fn list_call_events(&self, call_sid: &str) -> Result<Vec<CallEventRequest>> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}/Events.json",
            self.api_base, self.account_sid, call_sid
        );
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .context("error fetching call events from vendor API")?
            .error_for_status()
            .context("vendor API returned an error status for call events")?;

        let page: ListCallEventsResponse = response
            .json()
            .await
            .context("failed to decode call events from vendor API")?;

        Ok(page.events.into_iter().map(|event| event.request).collect())
    }
}

/// Reconstructs call metadata by replaying a call's event history.
pub struct MetadataResolver {
    client: Box<dyn CallEventsClient>,
}

impl MetadataResolver {
    pub fn new(client: Box<dyn CallEventsClient>) -> Self {
        Self { client }
    }

    /// Never fails: a fetch error is reported and resolves to zero-valued
    /// metadata so the caller's webhook response is not held hostage by
    /// the vendor API.
    pub async fn resolve(&self, call_sid: &str) -> CallMetadata {
        let events = match self.client.list_call_events(call_sid).await {
            Ok(events) => events,
            Err(e) => {
                error!(call_sid, "failed to fetch call events: {:?}", e);
                return CallMetadata::default();
            }
        };

        CallMetadata {
            connected: connected(&events),
            lang: lang(&events),
            voicemail_recording_id: voicemail_recording_id(&events),
        }
    }
}

fn connected(events: &[CallEventRequest]) -> bool {
    events.iter().any(|event| {
        event.parameters.dial_call_status == "completed"
            && !event.parameters.dial_call_duration.is_empty()
    })
}

/// The language the caller selected, read from the first event URL that
/// carries a `lang` query parameter. Events are chronological, so this
/// is the earliest selection on record.
fn lang(events: &[CallEventRequest]) -> String {
    for event in events {
        let url = match Url::parse(&event.url) {
            Ok(url) => url,
            Err(e) => {
                warn!("unable to parse event URL '{}': {}", event.url, e);
                continue;
            }
        };
        if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "lang") {
            if !value.is_empty() {
                return value.into_owned();
            }
        }
    }
    String::new()
}

fn voicemail_recording_id(events: &[CallEventRequest]) -> String {
    events
        .iter()
        .find(|event| {
            event.parameters.digits == "hangup" && !event.parameters.recording_sid.is_empty()
        })
        .map(|event| event.parameters.recording_sid.clone())
        .unwrap_or_default()
}
