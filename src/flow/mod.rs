//! The IVR call-flow state machine.
//!
//! Each webhook from the telephony vendor corresponds to one [`CallStep`].
//! [`VoiceFlow::respond`] maps the step and its decoded parameters to the
//! markup document answering that webhook. The flow owns no state between
//! requests; everything it needs arrives with the step.

use crate::config::Config;
use crate::i18n::{MessageCatalog, Messages};
use crate::twiml::{Dial, DialNumber, DialTarget, Gather, Record, Say, Verb, VoiceResponse};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;


const CALL_STATUS_COMPLETED: &str = "completed";
/// Key a caller presses to start (and finish) a voicemail recording.
const KEY_RECORD_VOICEMAIL: &str = "9";
/// Sentinel the vendor places in `Digits` when the caller hung up
/// during a recording instead of pressing a key.
const DIGITS_HANGUP: &str = "hangup";

/// One phase of the IVR sequence, determined by which webhook URL was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStep {
    Inbound,
    DialOut,
    ConnectAgent,
    AcceptCall,
    ConfirmConnected,
    EndCall,
    StartVoicemail,
    EndVoicemail,
    StatusCallback,
}

/// Decoded form parameters of one webhook request.
pub struct StepParams<'a> {
    params: &'a HashMap<String, String>,
}

impl<'a> StepParams<'a> {
    pub fn new(params: &'a HashMap<String, String>) -> Self {
        Self { params }
    }

    pub fn get(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn from(&self) -> &str {
        self.get("From")
    }

    pub fn to(&self) -> &str {
        self.get("To")
    }

    pub fn digits(&self) -> &str {
        self.get("Digits")
    }

    pub fn dial_call_status(&self) -> &str {
        self.get("DialCallStatus")
    }

    pub fn dial_call_duration(&self) -> &str {
        self.get("DialCallDuration")
    }

    pub fn recording_sid(&self) -> &str {
        self.get("RecordingSid")
    }

    pub fn call_sid(&self) -> &str {
        self.get("CallSid")
    }

    pub fn call_status(&self) -> &str {
        self.get("CallStatus")
    }

    pub fn direction(&self) -> &str {
        self.get("Direction")
    }
}

/// Relative next-action URLs, supplied by the handler layer which owns
/// routing. The flow only ever appends a `lang` query parameter.
#[derive(Debug, Clone, Default)]
pub struct FlowRoutes {
    pub dial_out: String,
    pub connect_agent: String,
    pub accept_call: String,
    pub confirm_connected: String,
    pub end_call: String,
    pub start_voicemail: String,
    pub end_voicemail: String,
    pub recording_status: String,
}

pub struct VoiceFlow {
    config: Arc<Config>,
    catalog: Arc<MessageCatalog>,
    routes: FlowRoutes,
}

impl VoiceFlow {
    pub fn new(config: Arc<Config>, catalog: Arc<MessageCatalog>, routes: FlowRoutes) -> Self {
        Self {
            config,
            catalog,
            routes,
        }
    }

    /// Produces the markup answering one webhook step. Always returns a
    /// valid document; anomalies resolve to the empty response.
    pub fn respond(&self, step: CallStep, lang: &str, params: &StepParams) -> String {
        match step {
            CallStep::Inbound => self.inbound(params),
            CallStep::DialOut => self.dial_out(params),
            CallStep::ConnectAgent => self.connect_agent(params),
            CallStep::AcceptCall => self.accept_call(lang),
            CallStep::ConfirmConnected => self.confirm_connected(lang),
            CallStep::EndCall => self.end_call(lang, params),
            CallStep::StartVoicemail => self.start_voicemail(lang, params),
            CallStep::EndVoicemail => self.end_voicemail(lang, params),
            // Side effects of the status callback (metadata resolution,
            // notifications) live in the handler; the vendor just needs
            // an empty acknowledgement.
            CallStep::StatusCallback => VoiceResponse::noop().render(),
        }
    }

    /// An agent calling the company number gets a dial-out prompt;
    /// everyone else enters the language menu.
    fn inbound(&self, params: &StepParams) -> String {
        if self
            .config
            .twilio
            .agent_dids
            .iter()
            .any(|did| did == params.from())
        {
            return self.gather_outbound_number();
        }
        self.gather_language(true)
    }

    fn gather_outbound_number(&self) -> String {
        let say = self.say("en", |m| &m.voice.gather_outbound);
        VoiceResponse::new(vec![Verb::Gather(Gather {
            action: self.routes.dial_out.clone(),
            num_digits: None,
            timeout: self.config.twilio.timeouts.gather_outbound_number,
            verbs: vec![say],
        })])
        .render()
    }

    /// Dials the gathered destination number as the company.
    fn dial_out(&self, params: &StepParams) -> String {
        let mut dial = Dial {
            target: DialTarget::Number(params.digits().to_string()),
            ..Dial::default()
        };
        if self.config.twilio.record_outbound_calls {
            dial.record = "record-from-answer".to_string();
            dial.recording_status_callback = self.routes.recording_status.clone();
        }
        VoiceResponse::new(vec![Verb::Dial(dial)]).render()
    }

    /// A valid keypress selects the caller's language and rings the
    /// agents; anything else re-plays the menu without the welcome.
    fn connect_agent(&self, params: &StepParams) -> String {
        match params.digits() {
            "1" => self.dial_agents("en", params.to()),
            "2" => self.dial_agents("fr", params.to()),
            _ => self.gather_language(false),
        }
    }

    /// The language menu. The welcome line plays only on the first round
    /// so invalid input does not repeat the full greeting.
    fn gather_language(&self, intro: bool) -> String {
        let say_en = self.say_template("en", |m| &m.voice.lang_select, &[("digit", "1")]);
        let say_fr = self.say_template("fr", |m| &m.voice.lang_select, &[("digit", "2")]);

        let gather = Gather {
            action: self.routes.connect_agent.clone(),
            num_digits: Some(1),
            timeout: self.config.twilio.timeouts.gather_language,
            verbs: vec![say_en.clone(), say_fr.clone()],
        };

        if intro {
            let welcome = self.say("en", |m| &m.voice.welcome);
            let gather_welcome = Gather {
                verbs: vec![welcome, say_en, say_fr],
                ..gather.clone()
            };
            return VoiceResponse::new(vec![Verb::Gather(gather_welcome), Verb::Gather(gather)])
                .render();
        }
        VoiceResponse::new(vec![Verb::Gather(gather.clone()), Verb::Gather(gather)]).render()
    }

    /// Rings every agent in parallel, spoofing the caller ID to the
    /// company number the client dialed. Each leg confirms acceptance via
    /// the accept-call webhook; the overall dial outcome lands on end-call.
    fn dial_agents(&self, lang: &str, caller_id: &str) -> String {
        let say_hold = self.say(lang, |m| &m.voice.please_hold);

        let numbers = self
            .config
            .twilio
            .agent_dids
            .iter()
            .map(|did| DialNumber {
                phone_number: did.clone(),
                url: with_lang(&self.routes.accept_call, lang),
            })
            .collect();

        let mut dial = Dial {
            action: with_lang(&self.routes.end_call, lang),
            caller_id: caller_id.to_string(),
            timeout: Some(self.config.twilio.timeouts.dial_agents),
            target: DialTarget::Numbers(numbers),
            ..Dial::default()
        };
        if self.config.twilio.record_inbound_calls {
            dial.record = "record-from-answer".to_string();
            dial.recording_status_callback = self.routes.recording_status.clone();
        }

        VoiceResponse::new(vec![say_hold, Verb::Dial(dial)]).render()
    }

    /// Asks the agent for a keypress, distinguishing a live agent from
    /// their personal voicemail answering the leg. No press hangs up the
    /// leg, which surfaces on end-call as completed without a duration.
    fn accept_call(&self, lang: &str) -> String {
        let say = self.say(lang, |m| &m.voice.accept_call);
        VoiceResponse::new(vec![
            Verb::Gather(Gather {
                action: self.routes.confirm_connected.clone(),
                num_digits: Some(1),
                timeout: self.config.twilio.timeouts.gather_accept_call,
                verbs: vec![say],
            }),
            Verb::Hangup,
        ])
        .render()
    }

    fn confirm_connected(&self, lang: &str) -> String {
        let say = self.say(lang, |m| &m.voice.confirm_connected);
        VoiceResponse::new(vec![say]).render()
    }

    /// End of the agent dial. Busy, no answer, or a completed dial with
    /// no duration (the agent's personal voicemail picked up) all route
    /// the caller to company voicemail.
    fn end_call(&self, lang: &str, params: &StepParams) -> String {
        let status = params.dial_call_status();
        let duration = params.dial_call_duration();

        if status == "busy"
            || status == "no-answer"
            || (status == CALL_STATUS_COMPLETED && duration.is_empty())
        {
            return self.gather_voicemail_start(lang);
        }
        if status == CALL_STATUS_COMPLETED {
            return VoiceResponse::noop().render();
        }
        error!("unexpected DialCallStatus: {}", status);
        VoiceResponse::noop().render()
    }

    fn gather_voicemail_start(&self, lang: &str) -> String {
        let invite = self.say_template(
            lang,
            |m| &m.voice.voicemail,
            &[("digit", KEY_RECORD_VOICEMAIL)],
        );
        let repeat = self.say_template(
            lang,
            |m| &m.voice.voicemail_repeat,
            &[("digit", KEY_RECORD_VOICEMAIL)],
        );

        let gather = |say: Verb| {
            Verb::Gather(Gather {
                action: with_lang(&self.routes.start_voicemail, lang),
                num_digits: Some(1),
                timeout: self.config.twilio.timeouts.gather_start_voicemail,
                verbs: vec![say],
            })
        };
        VoiceResponse::new(vec![gather(invite), gather(repeat)]).render()
    }

    /// The recording key starts the recording; any other key re-plays
    /// the invitation.
    fn start_voicemail(&self, lang: &str, params: &StepParams) -> String {
        if params.digits() != KEY_RECORD_VOICEMAIL {
            return self.gather_voicemail_start(lang);
        }
        self.record_voicemail(lang, false)
    }

    /// A natural hangup ends the flow; a keypress means the caller wants
    /// to re-record their message.
    fn end_voicemail(&self, lang: &str, params: &StepParams) -> String {
        if params.digits() == DIGITS_HANGUP {
            return VoiceResponse::noop().render();
        }
        self.record_voicemail(lang, true)
    }

    fn record_voicemail(&self, lang: &str, rerecord: bool) -> String {
        let say = if rerecord {
            self.say(lang, |m| &m.voice.re_record)
        } else {
            self.say_template(
                lang,
                |m| &m.voice.record_after_tone,
                &[("digit", KEY_RECORD_VOICEMAIL)],
            )
        };
        VoiceResponse::new(vec![
            say,
            Verb::Record(Record {
                action: with_lang(&self.routes.end_voicemail, lang),
                finish_on_key: KEY_RECORD_VOICEMAIL.to_string(),
                recording_status_callback: self.routes.recording_status.clone(),
                timeout: Some(0),
            }),
        ])
        .render()
    }

    fn say(&self, lang: &str, getter: impl Fn(&Messages) -> &str) -> Verb {
        self.say_template(lang, getter, &[])
    }

    fn say_template(
        &self,
        lang: &str,
        getter: impl Fn(&Messages) -> &str,
        replacements: &[(&str, &str)],
    ) -> Verb {
        let message = self.catalog.message_replace(lang, getter, replacements);
        let language = match self.config.twilio.languages.get(lang) {
            Some(voice_lang) => voice_lang.clone(),
            None => {
                error!("no voice language configured for language code '{}'", lang);
                String::new()
            }
        };
        Verb::Say(Say { language, message })
    }
}

fn with_lang(path: &str, lang: &str) -> String {
    format!("{}?lang={}", path, urlencoding::encode(lang))
}
