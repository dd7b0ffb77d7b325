//! Voice/messaging markup documents returned to the telephony vendor.
//!
//! The vendor parses these responses to decide what happens next on the
//! call, so verb and attribute names must match its schema exactly.

use std::fmt::Write;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// An ordered list of verbs rendered as a voice response document.
/// An empty response instructs the vendor to do nothing.
#[derive(Debug, Clone, Default)]
pub struct VoiceResponse {
    pub verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new(verbs: Vec<Verb>) -> Self {
        Self { verbs }
    }

    /// The empty response. Safe to return for any webhook.
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn render(&self) -> String {
        let mut out = String::from(XML_HEADER);
        if self.verbs.is_empty() {
            out.push_str("<Response/>");
            return out;
        }
        out.push_str("<Response>");
        for verb in &self.verbs {
            verb.write_xml(&mut out);
        }
        out.push_str("</Response>");
        out
    }
}

/// Reply document for the messaging webhook.
#[derive(Debug, Clone, Default)]
pub struct MessagingResponse {
    pub body: String,
}

impl MessagingResponse {
    pub fn render(&self) -> String {
        let mut out = String::from(XML_HEADER);
        out.push_str("<Response><Message>");
        push_escaped(&mut out, &self.body);
        out.push_str("</Message></Response>");
        out
    }
}

#[derive(Debug, Clone)]
pub enum Verb {
    Say(Say),
    Gather(Gather),
    Dial(Dial),
    Record(Record),
    Hangup,
}

#[derive(Debug, Clone, Default)]
pub struct Say {
    pub language: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Gather {
    pub action: String,
    pub num_digits: Option<u8>,
    pub timeout: u16,
    pub verbs: Vec<Verb>,
}

#[derive(Debug, Clone, Default)]
pub struct Dial {
    pub action: String,
    pub caller_id: String,
    pub timeout: Option<u16>,
    /// Vendor recording mode, e.g. "record-from-answer". Empty disables.
    pub record: String,
    pub recording_status_callback: String,
    pub target: DialTarget,
}

#[derive(Debug, Clone)]
pub enum DialTarget {
    /// A single destination, rendered as the dial's text content.
    Number(String),
    /// Parallel legs, one `<Number>` child per destination.
    Numbers(Vec<DialNumber>),
}

impl Default for DialTarget {
    fn default() -> Self {
        DialTarget::Number(String::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DialNumber {
    pub phone_number: String,
    /// Webhook invoked on the leg that answers.
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Record {
    pub action: String,
    pub finish_on_key: String,
    pub recording_status_callback: String,
    pub timeout: Option<u16>,
}

impl Verb {
    fn write_xml(&self, out: &mut String) {
        match self {
            Verb::Say(say) => {
                out.push_str("<Say");
                push_attr(out, "language", &say.language);
                out.push('>');
                push_escaped(out, &say.message);
                out.push_str("</Say>");
            }
            Verb::Gather(gather) => {
                out.push_str("<Gather");
                push_attr(out, "action", &gather.action);
                if let Some(num_digits) = gather.num_digits {
                    let _ = write!(out, r#" numDigits="{}""#, num_digits);
                }
                let _ = write!(out, r#" timeout="{}""#, gather.timeout);
                out.push('>');
                for verb in &gather.verbs {
                    verb.write_xml(out);
                }
                out.push_str("</Gather>");
            }
            Verb::Dial(dial) => {
                out.push_str("<Dial");
                push_attr(out, "action", &dial.action);
                push_attr(out, "callerId", &dial.caller_id);
                if let Some(timeout) = dial.timeout {
                    let _ = write!(out, r#" timeout="{}""#, timeout);
                }
                push_attr(out, "record", &dial.record);
                push_attr(out, "recordingStatusCallback", &dial.recording_status_callback);
                out.push('>');
                match &dial.target {
                    DialTarget::Number(number) => push_escaped(out, number),
                    DialTarget::Numbers(numbers) => {
                        for number in numbers {
                            out.push_str("<Number");
                            push_attr(out, "url", &number.url);
                            out.push('>');
                            push_escaped(out, &number.phone_number);
                            out.push_str("</Number>");
                        }
                    }
                }
                out.push_str("</Dial>");
            }
            Verb::Record(record) => {
                out.push_str("<Record");
                push_attr(out, "action", &record.action);
                push_attr(out, "finishOnKey", &record.finish_on_key);
                push_attr(
                    out,
                    "recordingStatusCallback",
                    &record.recording_status_callback,
                );
                if let Some(timeout) = record.timeout {
                    let _ = write!(out, r#" timeout="{}""#, timeout);
                }
                out.push_str("/>");
            }
            Verb::Hangup => out.push_str("<Hangup/>"),
        }
    }
}

// Empty attributes are omitted, matching the vendor SDK's behavior.
fn push_attr(out: &mut String, name: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    push_escaped(out, value);
    out.push('"');
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}
