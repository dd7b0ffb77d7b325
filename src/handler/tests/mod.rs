use crate::app::{AppState, AppStateBuilder};
use crate::config::Config;
use crate::handler::middleware::signature::verify;
use crate::handler::{recordings, sms, voice};
use crate::mail::tests::RecordingTransport;
use crate::mail::OutboundMail;
use crate::twilio::{CallEventParameters, CallEventRequest, MockCallEventsClient};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Form;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::hmac;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const CLIENT_DID: &str = "+17055552323";

fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn event(url: &str, parameters: CallEventParameters) -> CallEventRequest {
    CallEventRequest {
        url: url.to_string(),
        parameters,
    }
}

/// State wired with a canned event history and a transport that records
/// outgoing mail instead of sending it.
fn state_with_events(
    events: anyhow::Result<Vec<CallEventRequest>>,
) -> (AppState, Arc<Mutex<Vec<OutboundMail>>>) {
    let mut config = Config::default();
    config.mail.to.address = "agents@example.com".to_string();
    config.mail.recordings_base_url = "https://voice.example.com".to_string();

    let mut client = MockCallEventsClient::new();
    client.expect_list_call_events().return_once(move |_| events);

    let transport = RecordingTransport::default();
    let sent = transport.sent.clone();

    let state = AppStateBuilder::new()
        .config(config)
        .events_client(Box::new(client))
        .mail_transport(Box::new(transport))
        .build()
        .unwrap();
    (state, sent)
}

fn completed_inbound_call() -> HashMap<String, String> {
    form(&[
        ("CallSid", "CA100"),
        ("From", CLIENT_DID),
        ("Direction", "inbound"),
        ("CallStatus", "completed"),
    ])
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_status_callback_sends_voicemail_notice() {
    let (state, sent) = state_with_events(Ok(vec![
        event(
            "https://voice.example.com/voice/end-call?lang=fr",
            CallEventParameters {
                dial_call_status: "no-answer".to_string(),
                ..CallEventParameters::default()
            },
        ),
        event(
            "https://voice.example.com/voice/end-voicemail?lang=fr",
            CallEventParameters {
                digits: "hangup".to_string(),
                recording_sid: "RE0123".to_string(),
                ..CallEventParameters::default()
            },
        ),
    ]));

    let response = voice::status_callback(
        State(state),
        Query(voice::LangQuery::default()),
        Form(completed_inbound_call()),
    )
    .await;

    let xml = body_string(response).await;
    assert!(xml.ends_with("<Response/>"));

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].subject,
        format!("Nouveau message vocal de {}", CLIENT_DID)
    );
    assert!(sent[0]
        .body
        .contains("https://voice.example.com/recordings/RE0123"));
}

#[tokio::test]
async fn test_status_callback_sends_missed_call_notice() {
    let (state, sent) = state_with_events(Ok(vec![event(
        "https://voice.example.com/voice/end-call?lang=en",
        CallEventParameters {
            dial_call_status: "busy".to_string(),
            ..CallEventParameters::default()
        },
    )]));

    voice::status_callback(
        State(state),
        Query(voice::LangQuery::default()),
        Form(completed_inbound_call()),
    )
    .await;

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, format!("Missed call from {}", CLIENT_DID));
}

#[tokio::test]
async fn test_status_callback_connected_call_sends_nothing() {
    let (state, sent) = state_with_events(Ok(vec![event(
        "https://voice.example.com/voice/end-call?lang=en",
        CallEventParameters {
            dial_call_status: "completed".to_string(),
            dial_call_duration: "42".to_string(),
            ..CallEventParameters::default()
        },
    )]));

    voice::status_callback(
        State(state),
        Query(voice::LangQuery::default()),
        Form(completed_inbound_call()),
    )
    .await;

    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_callback_without_language_sends_nothing() {
    // No event carries a lang: the caller hung up before the menu.
    let (state, sent) = state_with_events(Ok(vec![event(
        "https://voice.example.com/voice/inbound",
        CallEventParameters::default(),
    )]));

    voice::status_callback(
        State(state),
        Query(voice::LangQuery::default()),
        Form(completed_inbound_call()),
    )
    .await;

    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_callback_fetch_failure_skips_notification() {
    let (state, sent) = state_with_events(Err(anyhow::anyhow!("connection refused")));

    let response = voice::status_callback(
        State(state),
        Query(voice::LangQuery::default()),
        Form(completed_inbound_call()),
    )
    .await;

    // still a valid empty response for the vendor
    assert!(body_string(response).await.ends_with("<Response/>"));
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_callback_ignores_outbound_calls() {
    let (state, sent) = state_with_events(Ok(vec![]));

    let params = form(&[
        ("CallSid", "CA100"),
        ("From", CLIENT_DID),
        ("Direction", "outbound-api"),
        ("CallStatus", "completed"),
    ]);
    voice::status_callback(State(state), Query(voice::LangQuery::default()), Form(params)).await;

    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_handler_defaults_language() {
    let (state, _) = state_with_events(Ok(vec![]));
    let params = form(&[("DialCallStatus", "no-answer")]);

    let response = voice::end_call(
        State(state.clone()),
        Query(voice::LangQuery::default()),
        Form(params.clone()),
    )
    .await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );
    assert!(body_string(response)
        .await
        .contains("To leave us a voicemail"));

    let response = voice::end_call(
        State(state),
        Query(voice::LangQuery {
            lang: Some("fr".to_string()),
        }),
        Form(params),
    )
    .await;
    assert!(body_string(response).await.contains("message vocal"));
}

#[tokio::test]
async fn test_sms_inbound_notifies_and_replies_bilingually() {
    let (state, sent) = state_with_events(Ok(vec![]));

    let params = form(&[("From", CLIENT_DID), ("Body", "Do you ship to Gatineau?")]);
    let response = sms::inbound(State(state), Form(params)).await;

    let xml = body_string(response).await;
    assert!(xml.contains("Thank you for your message."));
    assert!(xml.contains("Merci pour votre message."));

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].subject,
        format!("New text message from {}", CLIENT_DID)
    );
    assert!(sent[0].body.contains("Do you ship to Gatineau?"));
}

#[tokio::test]
async fn test_recordings_redirects_to_vendor_console() {
    let response = recordings::get_recording(Path("RE0123".to_string())).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://www.twilio.com/console/voice/api/recordings/recording-logs/RE0123/download"
    );
}

#[test]
fn test_signature_verification() {
    let url = "https://voice.example.com/voice/inbound?lang=en";
    let body = Bytes::from_static(b"CallSid=CA123&From=%2B17055552323&To=%2B16137775650");

    // parameters decoded, sorted by name and appended as name+value
    let signed = format!("{}CallSidCA123From+17055552323To+16137775650", url);
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, b"token");
    let signature = STANDARD.encode(hmac::sign(&key, signed.as_bytes()).as_ref());

    assert!(verify("token", url, &body, &signature));
    assert!(!verify("token", url, &body, "bogus"));
    assert!(!verify("other-token", url, &body, &signature));

    let tampered = Bytes::from_static(b"CallSid=CA999&From=%2B17055552323&To=%2B16137775650");
    assert!(!verify("token", url, &tampered, &signature));
}
