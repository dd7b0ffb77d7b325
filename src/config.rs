use anyhow::Error;
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    #[clap(long, default_value = "voicedesk.toml")]
    pub conf: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http_addr: String,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    /// Language assumed when a webhook arrives without a `lang` query parameter.
    pub default_lang: String,
    pub twilio: TwilioConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub api_base: String,
    /// Personal numbers of the agents. Calls from these numbers enter the
    /// outbound-dial flow; everyone else gets the language menu.
    pub agent_dids: Vec<String>,
    /// Maps a message-catalog language code to the vendor's voice language tag.
    pub languages: HashMap<String, String>,
    pub record_inbound_calls: bool,
    pub record_outbound_calls: bool,
    /// Timeout for REST calls against the vendor API, in seconds.
    pub http_timeout: u64,
    pub timeouts: StepTimeouts,
}

/// Per-step gather/dial timeouts, in seconds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StepTimeouts {
    pub gather_outbound_number: u16,
    pub gather_language: u16,
    pub dial_agents: u16,
    pub gather_accept_call: u16,
    pub gather_start_voicemail: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub sendgrid_api_key: String,
    pub api_base: String,
    pub from: MailAddress,
    pub to: MailAddress,
    /// Public base URL of this service, used to build voicemail links.
    pub recordings_base_url: String,
    /// Timeout for mail API calls, in seconds.
    pub http_timeout: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MailAddress {
    pub name: String,
    pub address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            log_level: Some("info".to_string()),
            log_file: None,
            default_lang: "en".to_string(),
            twilio: TwilioConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            api_base: "https://api.twilio.com".to_string(),
            agent_dids: vec![],
            languages: HashMap::from([
                ("en".to_string(), "en-CA".to_string()),
                ("fr".to_string(), "fr-CA".to_string()),
            ]),
            record_inbound_calls: false,
            record_outbound_calls: false,
            http_timeout: 10,
            timeouts: StepTimeouts::default(),
        }
    }
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            gather_outbound_number: 10,
            gather_language: 10,
            dial_agents: 25,
            gather_accept_call: 5,
            gather_start_voicemail: 10,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sendgrid_api_key: String::new(),
            api_base: "https://api.sendgrid.com".to_string(),
            from: MailAddress::default(),
            to: MailAddress::default(),
            recordings_base_url: String::new(),
            http_timeout: 10,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let mut config: Config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{}: {}", e, path))?,
        )?;
        config.apply_env();
        Ok(config)
    }

    /// Secrets may be kept out of the config file and supplied via the
    /// environment (a `.env` file is loaded at startup).
    fn apply_env(&mut self) {
        if self.twilio.account_sid.is_empty() {
            if let Ok(sid) = std::env::var("TWILIO_ACCOUNT_SID") {
                self.twilio.account_sid = sid;
            }
        }
        if self.twilio.auth_token.is_empty() {
            if let Ok(token) = std::env::var("TWILIO_AUTH_TOKEN") {
                self.twilio.auth_token = token;
            }
        }
        if self.mail.sendgrid_api_key.is_empty() {
            if let Ok(key) = std::env::var("SENDGRID_API_KEY") {
                self.mail.sendgrid_api_key = key;
            }
        }
    }
}
